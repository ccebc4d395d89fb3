// ==========================================
// EstrichManager - Internationalization (i18n)
// ==========================================
// Backed by rust-i18n; locales/en.yml (default) and locales/de.yml
// Note: the rust_i18n::i18n! macro is initialized in lib.rs
// ==========================================

/// Locales shipped with the crate
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "de"];

/// Current process-wide locale
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// Set the process-wide locale
///
/// # Parameters
/// - locale: "en" or "de"
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// Normalize a requested locale to a supported one ("de-AT" -> "de", unknown -> "en")
pub fn normalize_locale(locale: &str) -> &'static str {
    let primary = locale
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_lowercase();
    SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|l| *l == primary)
        .unwrap_or("en")
}

/// Translate a key (no arguments)
///
/// # Example
/// ```no_run
/// use estrich_manager::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// Translate a key with `%{name}` placeholders
///
/// # Example
/// ```no_run
/// use estrich_manager::i18n::t_with_args;
/// let msg = t_with_args("calendar.calibration_due", &[("reference", "Waage W-01")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    fill_placeholders(rust_i18n::t!(key).to_string(), args)
}

/// Translate a key in an explicit locale without touching the global one
///
/// Used for documents generated in a customer language (DoP).
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    let locale = normalize_locale(locale);
    fill_placeholders(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn fill_placeholders(mut result: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
