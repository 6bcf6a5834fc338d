//! Persona selection for chatsdj
//!
//! A persona is the personality the bot answers as: a display name, an
//! emoji icon, a system prompt, and an optional model override. Personas are
//! picked uniformly at random per turn from a [`PersonaSource`], falling back
//! to a built-in default.

pub mod sheets;

pub use sheets::GoogleSheetsPersonaSource;

use crate::config::GoogleConfig;
use crate::error::Result;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;

/// Display name of the built-in persona
pub const DEFAULT_PERSONA_NAME: &str = "板東AI二";

/// System prompt of the built-in persona
pub const DEFAULT_PERSONA_PROMPT: &str = "あなたはタレントで、かつて中日で活躍した元プロ野球選手の板東英二です。
口癖は「いやーほんまにもう」「それはあかんよ!」などです。
投資や儲け話が大好きで何かにつけてお金儲けをしようとします。
大好物はゆで卵でゆで卵について話をしようとしてきます。しゃべりは全て名古屋弁です。
今後のやりとりは全て板東英二になりきって答えてください。";

/// A personality the bot answers as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    /// Display name used as the message username
    pub name: String,
    /// Emoji name used as the message icon, without colons
    pub emoji: String,
    /// System prompt
    pub prompt: String,
    /// Model override
    pub model: Option<String>,
}

impl Persona {
    /// Built-in persona with the given icon
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::persona::Persona;
    ///
    /// let persona = Persona::default_with_emoji("egg");
    /// assert_eq!(persona.name, "板東AI二");
    /// assert!(persona.model.is_none());
    /// ```
    pub fn default_with_emoji(emoji: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_PERSONA_NAME.to_string(),
            emoji: emoji.into(),
            prompt: DEFAULT_PERSONA_PROMPT.to_string(),
            model: None,
        }
    }

    /// Builds a persona from a `[name, emoji, prompt, model?]` row
    ///
    /// Returns `None` unless name, emoji and prompt are all non-empty. A
    /// missing or empty model cell means no override.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::persona::Persona;
    ///
    /// let row = vec!["ずんだもん".to_string(), "zunda".to_string(), "なのだ".to_string()];
    /// let persona = Persona::from_row(&row).unwrap();
    /// assert_eq!(persona.emoji, "zunda");
    ///
    /// let incomplete = vec!["ずんだもん".to_string(), "".to_string(), "なのだ".to_string()];
    /// assert!(Persona::from_row(&incomplete).is_none());
    /// ```
    pub fn from_row(row: &[String]) -> Option<Self> {
        let cell = |i: usize| row.get(i).map(|c| c.trim()).filter(|c| !c.is_empty());

        Some(Self {
            name: cell(0)?.to_string(),
            emoji: cell(1)?.to_string(),
            prompt: cell(2)?.to_string(),
            model: cell(3).map(str::to_string),
        })
    }
}

/// Tabular store of persona rows
#[async_trait]
pub trait PersonaSource: Send + Sync {
    /// Returns every persona row in source order
    async fn fetch_persona_rows(&self) -> Result<Vec<Vec<String>>>;
}

/// Creates the configured persona source, if any
///
/// # Errors
///
/// Returns error if the credentials cannot be decoded
pub fn create_source(config: &GoogleConfig) -> Result<Option<Arc<dyn PersonaSource>>> {
    let Some(spreadsheet_id) = config.spreadsheet_id.as_deref() else {
        return Ok(None);
    };
    let source = GoogleSheetsPersonaSource::from_config(config, spreadsheet_id)?;
    Ok(Some(Arc::new(source)))
}

/// Picks the persona for a turn
///
/// Without a source, or when the source has no rows, the default persona is
/// used. Otherwise a row is chosen uniformly at random; an incomplete row
/// also yields the default.
///
/// # Errors
///
/// Returns error if fetching rows fails
pub async fn select_persona(
    source: Option<&dyn PersonaSource>,
    default: &Persona,
) -> Result<Persona> {
    let Some(source) = source else {
        return Ok(default.clone());
    };

    let rows = source.fetch_persona_rows().await?;
    let Some(row) = pick_row(&rows) else {
        tracing::debug!("Persona source returned no rows; using default persona");
        return Ok(default.clone());
    };

    match Persona::from_row(row) {
        Some(persona) => {
            tracing::debug!("Selected persona: {}", persona.name);
            Ok(persona)
        }
        None => {
            tracing::warn!("Selected persona row is incomplete; using default persona");
            Ok(default.clone())
        }
    }
}

fn pick_row(rows: &[Vec<String>]) -> Option<&Vec<String>> {
    if rows.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..rows.len());
    rows.get(index)
}
