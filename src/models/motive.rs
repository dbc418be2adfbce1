//! 贷记单原因代码

/// 未指定原因时使用的代码
pub const DEFAULT_MOTIVE_CODE: &str = "01";

/// 未知代码时回退的原因
pub const FALLBACK_MOTIVE: &str = "Devolucion Total";

static MOTIVES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "01" => "Anulacion de la Operacion",
    "02" => "Anulacion por Error en el RUC",
    "03" => "Devolucion Total",
    "04" => "Correccion por error en la descripcion",
    "05" => "Devolucion por item",
};

/// 原因代码对应的门户显示文本，未知代码回退为 "Devolucion Total"
pub fn motive_text(code: &str) -> &'static str {
    MOTIVES.get(code).copied().unwrap_or(FALLBACK_MOTIVE)
}

pub fn is_known_code(code: &str) -> bool {
    MOTIVES.contains_key(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(motive_text("01"), "Anulacion de la Operacion");
        assert_eq!(motive_text("03"), "Devolucion Total");
        assert_eq!(motive_text("05"), "Devolucion por item");
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(motive_text("99"), "Devolucion Total");
        assert_eq!(motive_text(""), "Devolucion Total");
        assert!(!is_known_code("99"));
    }
}
