//! Request-scoped value types: personas, episode requests and results.
//!
//! Everything here is built at the start of one "generate" action and dropped
//! once the result (or error) has been shown. Constructors validate, so a
//! value that exists is a value that satisfies its invariants.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the guest pushes back on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temperament {
    /// Soft, encouraging questions. (default)
    #[default]
    Gentle,
    /// Keeps asking why and for examples.
    Inquisitive,
    /// Challenges each claim head-on.
    Contrarian,
    /// Twists words and sets verbal traps.
    Evasive,
}

impl Temperament {
    pub const ALL: [Temperament; 4] = [
        Temperament::Gentle,
        Temperament::Inquisitive,
        Temperament::Contrarian,
        Temperament::Evasive,
    ];

    /// The label shown to the model as the guest's style.
    pub fn label(self) -> &'static str {
        match self {
            Temperament::Gentle => "Nhẹ nhàng",
            Temperament::Inquisitive => "Thắc mắc",
            Temperament::Contrarian => "Bắt bẻ",
            Temperament::Evasive => "Lươn lẹo",
        }
    }
}

impl fmt::Display for Temperament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Temperament::Gentle => "gentle",
            Temperament::Inquisitive => "inquisitive",
            Temperament::Contrarian => "contrarian",
            Temperament::Evasive => "evasive",
        };
        f.write_str(s)
    }
}

/// Accepts the English names and the Vietnamese labels, case-insensitively.
impl FromStr for Temperament {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Temperament::ALL
            .into_iter()
            .find(|t| t.to_string() == needle || t.label().to_lowercase() == needle)
            .ok_or_else(|| InputError::UnknownTemperament(s.to_string()))
    }
}

/// The two characters of the show.
///
/// Deserialisation goes through [`PersonaConfig::new`], so blank names are
/// rejected there too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPersona")]
pub struct PersonaConfig {
    host_name: String,
    guest_name: String,
    guest_temperament: Temperament,
}

impl PersonaConfig {
    /// Build a persona pair; names are trimmed and must not be empty.
    pub fn new(
        host_name: impl Into<String>,
        guest_name: impl Into<String>,
        guest_temperament: Temperament,
    ) -> Result<Self, InputError> {
        let host_name = non_empty(host_name.into(), "host")?;
        let guest_name = non_empty(guest_name.into(), "guest")?;
        Ok(Self {
            host_name,
            guest_name,
            guest_temperament,
        })
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn guest_name(&self) -> &str {
        &self.guest_name
    }

    pub fn guest_temperament(&self) -> Temperament {
        self.guest_temperament
    }
}

#[derive(Deserialize)]
struct RawPersona {
    host_name: String,
    guest_name: String,
    #[serde(default)]
    guest_temperament: Temperament,
}

impl TryFrom<RawPersona> for PersonaConfig {
    type Error = InputError;

    fn try_from(raw: RawPersona) -> Result<Self, Self::Error> {
        PersonaConfig::new(raw.host_name, raw.guest_name, raw.guest_temperament)
    }
}

fn non_empty(name: String, role: &'static str) -> Result<String, InputError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyName { role });
    }
    Ok(trimmed.to_string())
}

/// Everything needed to write one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEpisodeRequest")]
pub struct EpisodeRequest {
    episode_number: u32,
    continuity_log: String,
    source_document_text: String,
    persona: PersonaConfig,
}

impl EpisodeRequest {
    /// Create a request with an empty continuity log.
    pub fn new(
        episode_number: u32,
        source_document_text: impl Into<String>,
        persona: PersonaConfig,
    ) -> Result<Self, InputError> {
        if episode_number == 0 {
            return Err(InputError::InvalidEpisodeNumber(episode_number));
        }
        Ok(Self {
            episode_number,
            continuity_log: String::new(),
            source_document_text: source_document_text.into(),
            persona,
        })
    }

    /// Attach the pasted ending of the previous episode. Stored verbatim.
    pub fn with_continuity_log(mut self, log: impl Into<String>) -> Self {
        self.continuity_log = log.into();
        self
    }

    pub fn episode_number(&self) -> u32 {
        self.episode_number
    }

    pub fn continuity_log(&self) -> &str {
        &self.continuity_log
    }

    pub fn source_document_text(&self) -> &str {
        &self.source_document_text
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }
}

#[derive(Deserialize)]
struct RawEpisodeRequest {
    episode_number: u32,
    #[serde(default)]
    continuity_log: String,
    source_document_text: String,
    persona: PersonaConfig,
}

impl TryFrom<RawEpisodeRequest> for EpisodeRequest {
    type Error = InputError;

    fn try_from(raw: RawEpisodeRequest) -> Result<Self, Self::Error> {
        Ok(EpisodeRequest::new(raw.episode_number, raw.source_document_text, raw.persona)?
            .with_continuity_log(raw.continuity_log))
    }
}

/// The script returned by the generation service, untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub script_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> PersonaConfig {
        PersonaConfig::new("Minh", "An", Temperament::Contrarian).unwrap()
    }

    #[test]
    fn persona_trims_names() {
        let p = PersonaConfig::new("  Minh ", "An\n", Temperament::Gentle).unwrap();
        assert_eq!(p.host_name(), "Minh");
        assert_eq!(p.guest_name(), "An");
    }

    #[test]
    fn persona_rejects_blank_names() {
        assert!(matches!(
            PersonaConfig::new("   ", "An", Temperament::Gentle),
            Err(InputError::EmptyName { role: "host" })
        ));
        assert!(matches!(
            PersonaConfig::new("Minh", "", Temperament::Gentle),
            Err(InputError::EmptyName { role: "guest" })
        ));
    }

    #[test]
    fn episode_zero_rejected() {
        let err = EpisodeRequest::new(0, "text", persona()).unwrap_err();
        assert!(matches!(err, InputError::InvalidEpisodeNumber(0)));
    }

    #[test]
    fn continuity_log_kept_verbatim() {
        let req = EpisodeRequest::new(2, "text", persona())
            .unwrap()
            .with_continuity_log("  ends with a cliffhanger\n");
        assert_eq!(req.continuity_log(), "  ends with a cliffhanger\n");
        assert_eq!(req.episode_number(), 2);
    }

    #[test]
    fn deserialize_rejects_episode_zero_and_blank_names() {
        let zero = r#"{
            "episode_number": 0,
            "continuity_log": "",
            "source_document_text": "x",
            "persona": {"host_name": "Minh", "guest_name": "An", "guest_temperament": "gentle"}
        }"#;
        let err = serde_json::from_str::<EpisodeRequest>(zero).unwrap_err();
        assert!(err.to_string().contains("Episode number"), "{err}");

        let blank = r#"{
            "episode_number": 2,
            "source_document_text": "x",
            "persona": {"host_name": "   ", "guest_name": "", "guest_temperament": "evasive"}
        }"#;
        assert!(serde_json::from_str::<EpisodeRequest>(blank).is_err());
        assert!(serde_json::from_str::<PersonaConfig>(
            r#"{"host_name": "Minh", "guest_name": " "}"#
        )
        .is_err());
    }

    #[test]
    fn deserialize_valid_request_trims_names() {
        let json = r#"{
            "episode_number": 4,
            "continuity_log": "An vừa đặt câu hỏi.",
            "source_document_text": "tài liệu",
            "persona": {"host_name": " Minh ", "guest_name": "An", "guest_temperament": "contrarian"}
        }"#;
        let req: EpisodeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.episode_number(), 4);
        assert_eq!(req.persona().host_name(), "Minh");
        assert_eq!(req.persona().guest_temperament(), Temperament::Contrarian);
        assert_eq!(req.continuity_log(), "An vừa đặt câu hỏi.");

        let again: EpisodeRequest =
            serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(again, req);
    }

    #[test]
    fn temperament_parses_english_and_vietnamese() {
        assert_eq!("Contrarian".parse::<Temperament>().unwrap(), Temperament::Contrarian);
        assert_eq!("lươn lẹo".parse::<Temperament>().unwrap(), Temperament::Evasive);
        assert_eq!("Thắc mắc".parse::<Temperament>().unwrap(), Temperament::Inquisitive);
        assert!("grumpy".parse::<Temperament>().is_err());
    }

    #[test]
    fn temperament_display_roundtrips_through_from_str() {
        for t in Temperament::ALL {
            assert_eq!(t.to_string().parse::<Temperament>().unwrap(), t);
        }
    }
}
