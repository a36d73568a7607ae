use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for console output. Plain when stdout is not a color terminal or
/// `NO_COLOR` is set.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    /// Storage keys and table names
    pub key: Style,
    /// Measured numbers: latency, counts
    pub value: Style,
    pub label: Style,
}

impl Theme {
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        if no_color || !console::colors_enabled() || !console::Term::stdout().is_term() {
            Self::plain()
        } else {
            Self::colored()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().blue().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow(),
            key: Style::new().bright_yellow(),
            value: Style::new().cyan().bold(),
            label: Style::new().bright_black(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            header: none.clone(),
            success: none.clone(),
            error: none.clone(),
            warn: none.clone(),
            key: none.clone(),
            value: none.clone(),
            label: none,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

/// `VARSTORE_QUIET=1` hides progress bars
pub fn is_quiet() -> bool {
    static QUIET: OnceLock<bool> = OnceLock::new();
    *QUIET.get_or_init(|| {
        std::env::var("VARSTORE_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
