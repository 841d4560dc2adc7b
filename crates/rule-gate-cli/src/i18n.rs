// crates/rule-gate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for every supported locale.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Rule Gate CLI stores user-facing strings in a small translation
//! catalog to keep messaging consistent across locales. All runtime output
//! should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - Variants are stable for CLI parsing and catalog lookup.
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next()?;
        SUPPORTED_LOCALES.iter().copied().find(|locale| locale.as_str() == lang)
    }

    /// Returns the supported locale labels joined for display (`en, ca`).
    #[must_use]
    pub fn supported_labels() -> String {
        SUPPORTED_LOCALES.iter().map(|locale| locale.as_str()).collect::<Vec<_>>().join(", ")
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "rule-gate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("audit.open_failed", "Failed to open audit sink: {error}"),
    ("run.passed", "Rule tests passed ({tests} test file(s), {rewritten} rule file(s) restored)."),
    ("run.skipped", "Left {path} untouched: it has no spec section."),
    ("run.policy_violation", "Policy violation in {path}: {detail}"),
    ("run.parse_failed", "Failed to parse {kind} {path}: {error}"),
    ("run.io_failed", "Failed to {action} {path}: {error}"),
    ("run.tests_failed", "Rule tests failed ({status})."),
    ("run.tests_failed.exit_code", "exit code {code}"),
    ("run.tests_failed.signal", "terminated by signal"),
    ("run.launch_failed", "Failed to launch the rule test runner: {error}"),
    ("run.restore_failed", "Failed to restore {count} rule file(s); restore them by hand:"),
    ("run.restore_failed.path", "  {path}: {error}"),
    ("run.restore_failed.prior", "The run had already failed: {error}"),
    (
        "run.interrupt.deferred",
        "Interrupt received; waiting for the rule test runner to exit so rule files can be \
         restored.",
    ),
    ("run.interrupt.unavailable", "Cannot watch for interrupts: {error}"),
    ("run.task_failed", "Rule test run aborted unexpectedly: {error}"),
    ("check.ok", "Policy check passed ({rules} rule(s) in {files} rule file(s))."),
    (
        "i18n.lang.invalid_env",
        "Invalid value for {env}: {value}. Expected one of: {supported}.",
    ),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Static Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "rule-gate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "Configuració vàlida."),
    ("audit.open_failed", "No s'ha pogut obrir el registre d'auditoria: {error}"),
    (
        "run.passed",
        "Les proves de regles han passat ({tests} fitxer(s) de prova, {rewritten} fitxer(s) de \
         regles restaurat(s)).",
    ),
    ("run.skipped", "S'ha deixat {path} intacte: no té secció spec."),
    ("run.policy_violation", "Infracció de la política a {path}: {detail}"),
    ("run.parse_failed", "No s'ha pogut analitzar {kind} {path}: {error}"),
    ("run.io_failed", "Ha fallat l'operació {action} a {path}: {error}"),
    ("run.tests_failed", "Les proves de regles han fallat ({status})."),
    ("run.tests_failed.exit_code", "codi de sortida {code}"),
    ("run.tests_failed.signal", "finalitzat per un senyal"),
    ("run.launch_failed", "No s'ha pogut iniciar l'executor de proves de regles: {error}"),
    (
        "run.restore_failed",
        "No s'han pogut restaurar {count} fitxer(s) de regles; restaureu-los manualment:",
    ),
    ("run.restore_failed.path", "  {path}: {error}"),
    ("run.restore_failed.prior", "L'execució ja havia fallat: {error}"),
    (
        "run.interrupt.deferred",
        "S'ha rebut una interrupció; s'espera que l'executor de proves acabi per poder restaurar \
         els fitxers de regles.",
    ),
    ("run.interrupt.unavailable", "No es poden vigilar les interrupcions: {error}"),
    ("run.task_failed", "L'execució de les proves de regles s'ha avortat: {error}"),
    (
        "check.ok",
        "La comprovació de la política ha passat ({rules} regla(es) en {files} fitxer(s)).",
    ),
    (
        "i18n.lang.invalid_env",
        "Valor no vàlid per a {env}: {value}. S'esperava un d'aquests: {supported}.",
    ),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the raw catalog entries for the requested locale.
#[must_use]
pub fn catalog_entries_for(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => CATALOG_EN,
        Locale::Ca => CATALOG_CA,
    }
}

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let locale = current_locale();
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
