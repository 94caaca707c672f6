//! Model catalogs for the chat and text completion endpoints.
//!
//! Static data: each catalog entry carries its wire code, a display
//! description, and the model's context limit. Lookup by wire code panics
//! on unknown codes — catalogs are the source of truth and an unknown code
//! is a caller bug, not a runtime condition.

/// Capability shared by all model catalogs.
pub trait CompletionModel {
    /// Wire code sent as the request's `model` field.
    fn code(&self) -> &'static str;
    /// Human-readable description for display.
    fn description(&self) -> &'static str;
    /// Context limit in tokens.
    fn max_tokens(&self) -> u32;
}

/// Models served by the chat completion endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatCompletionModel {
    /// `gpt-3.5-turbo` — cost effective, the default.
    Gpt35Turbo,
    /// `gpt-4` — most capable.
    Gpt4,
}

impl ChatCompletionModel {
    /// All chat models, catalog order.
    pub const ALL: &'static [Self] = &[Self::Gpt35Turbo, Self::Gpt4];

    /// Look up a model by its wire code.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not in the catalog.
    #[must_use]
    pub fn find_by_code(code: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.code() == code)
            .unwrap_or_else(|| panic!("unknown chat completion model code: {code}"))
    }
}

impl CompletionModel for ChatCompletionModel {
    fn code(&self) -> &'static str {
        match self {
            Self::Gpt35Turbo => "gpt-3.5-turbo",
            Self::Gpt4 => "gpt-4",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Gpt35Turbo => "GPT-3.5 Turbo - Cost effective (Default)",
            Self::Gpt4 => "GPT-4 - Most capable",
        }
    }

    fn max_tokens(&self) -> u32 {
        match self {
            Self::Gpt35Turbo => 4096,
            Self::Gpt4 => 8192,
        }
    }
}

/// Models served by the text completion endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextCompletionModel {
    /// `text-ada-001` — fastest.
    Ada,
    /// `text-babbage-001`.
    Babbage,
    /// `text-curie-001` — fast and efficient.
    Curie,
    /// `text-davinci-003` — most powerful, the default.
    Davinci,
}

impl TextCompletionModel {
    /// All text models, catalog order.
    pub const ALL: &'static [Self] = &[Self::Ada, Self::Babbage, Self::Curie, Self::Davinci];

    /// Look up a model by its wire code.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not in the catalog.
    #[must_use]
    pub fn find_by_code(code: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.code() == code)
            .unwrap_or_else(|| panic!("unknown text completion model code: {code}"))
    }
}

impl CompletionModel for TextCompletionModel {
    fn code(&self) -> &'static str {
        match self {
            Self::Ada => "text-ada-001",
            Self::Babbage => "text-babbage-001",
            Self::Curie => "text-curie-001",
            Self::Davinci => "text-davinci-003",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Ada => "Ada - Fastest",
            Self::Babbage => "Babbage - Powerful",
            Self::Curie => "Curie - Fast and efficient",
            Self::Davinci => "Davinci - Most powerful (Default)",
        }
    }

    fn max_tokens(&self) -> u32 {
        match self {
            Self::Ada | Self::Babbage | Self::Curie => 2049,
            Self::Davinci => 4097,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
