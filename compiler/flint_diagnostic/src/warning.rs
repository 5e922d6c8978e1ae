//! Opt-in warning classes.

bitflags::bitflags! {
    /// Warning classes a compile can enable. Warnings outside the enabled
    /// set are never constructed.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct WarningClass: u8 {
        /// Numeric conversions that change a constant or narrow a value.
        const CONVERSION = 1 << 0;
        /// Pointer conversions to a larger alignment class.
        const CAST = 1 << 1;
    }
}

impl WarningClass {
    /// Parse a comma-separated list such as `"conversion,cast"`.
    pub fn parse_list(list: &str) -> Option<WarningClass> {
        let mut classes = WarningClass::empty();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            classes |= match name {
                "conversion" => WarningClass::CONVERSION,
                "cast" => WarningClass::CAST,
                "all" => WarningClass::all(),
                _ => return None,
            };
        }
        Some(classes)
    }
}
