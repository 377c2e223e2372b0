/// The locales a resolver works with.
///
/// `locale` is the current locale, `fallback` the locale tried when the
/// current one has no value, and `default` the application default tried last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleContext {
    locale: String,
    fallback: String,
    default: String,
}

impl LocaleContext {
    pub fn new(locale: &str, fallback: &str) -> Self {
        Self {
            locale: locale.to_string(),
            fallback: fallback.to_string(),
            default: locale.to_string(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn default_locale(&self) -> &str {
        &self.default
    }

    /// Point the current, fallback and default locale at `locale` together.
    pub fn set_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
        self.fallback = locale.to_string();
        self.default = locale.to_string();
    }

    /// A copy with every locale set to `locale`.
    pub fn with_locale(&self, locale: &str) -> Self {
        let mut next = self.clone();
        next.set_locale(locale);
        next
    }

    /// Locales to try, in order.
    ///
    /// With `fallback_chain` the chain is requested (or current), fallback,
    /// default with duplicates removed; otherwise only the requested (or
    /// current) locale.
    pub fn candidates(&self, requested: Option<&str>, fallback_chain: bool) -> Vec<String> {
        let first = requested.filter(|l| !l.is_empty()).unwrap_or(&self.locale);

        if !fallback_chain {
            return vec![first.to_string()];
        }

        let mut chain: Vec<String> = Vec::with_capacity(3);
        for locale in [first, self.fallback.as_str(), self.default.as_str()] {
            if !locale.is_empty() && !chain.iter().any(|l| l == locale) {
                chain.push(locale.to_string());
            }
        }
        chain
    }
}
