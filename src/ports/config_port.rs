//! Configuration access port trait.
//!
//! Values are addressed by INI section and key. Typed getters fall back to
//! `default` when the key is missing or does not parse; `validate_*` in
//! `domain::config_validation` reject values that do not parse.

pub trait ConfigPort {
    /// `None` for missing or blank values.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
