//! Prompt templates for episode scripts and series plans.
//!
//! Every piece of fixed prose sent to the model lives here, so a wording
//! change touches one file and unit tests can pin the exact layout without a
//! live model.
//!
//! An episode prompt always has six parts, in this order:
//!
//! 1. role framing
//! 2. episode number
//! 3. character roster (names, voice framing, guest temperament directive)
//! 4. stylistic requirements
//! 5. continuity log, verbatim
//! 6. source text, truncated to the configured number of characters
//!
//! A planned-episode prompt instead names the series and the episode's
//! outline, and asks for a JSON array of timed, attributed lines.

use crate::episode::{EpisodeRequest, PersonaConfig, Temperament};
use crate::series::{EpisodeOutline, SeriesPlan};
use serde::{Deserialize, Serialize};

/// Default number of source characters embedded in one request.
pub const DEFAULT_TRUNCATION_LIMIT: usize = 10_000;

/// Part 1: who the model is supposed to be.
pub const ROLE_FRAMING: &str = "Bạn là biên kịch Podcast chuyên nghiệp.";

/// Voice framing for the host line of the roster.
pub const HOST_FRAMING: &str = "Giọng Nam, thông tuệ, điềm đạm.";

/// Voice framing for the guest line; the style label follows it.
pub const GUEST_FRAMING: &str = "Giọng Nữ, phong cách";

/// Part 4: fixed stylistic constraints, one per line.
pub const REQUIREMENTS: [&str; 3] = [
    "Chỉ sử dụng tiếng Việt chuẩn, không sai chính tả.",
    "Thời lượng kịch bản khoảng 1500-2000 từ để đảm bảo đọc từ 5-10 phút.",
    "Phân tích sâu, không nói nông cạn.",
];

/// Stand-in for an empty continuity log so part 5 is never silently missing.
pub const EMPTY_LOG_MARKER: &str = "(Không có — đây là tập mở đầu mạch câu chuyện.)";

pub const DIRECTIVE_GENTLE: &str =
    "Đặt câu hỏi nhẹ nhàng, gợi mở, khích lệ người dẫn giải thích thêm.";
pub const DIRECTIVE_INQUISITIVE: &str =
    "Liên tục thắc mắc, truy hỏi nguyên nhân và đòi ví dụ cụ thể cho từng luận điểm.";
pub const DIRECTIVE_CONTRARIAN: &str =
    "Phản biện thẳng thắn, đưa ra quan điểm trái chiều với mọi nhận định của người dẫn.";
pub const DIRECTIVE_EVASIVE: &str =
    "Thích bẻ lái, bắt bẻ từ ngữ lươn lẹo, giăng bẫy câu chữ để buộc người dẫn làm rõ vấn đề.";

/// Temperament → behavioural directive for the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveTable {
    pub gentle: String,
    pub inquisitive: String,
    pub contrarian: String,
    pub evasive: String,
}

impl Default for DirectiveTable {
    fn default() -> Self {
        Self {
            gentle: DIRECTIVE_GENTLE.to_string(),
            inquisitive: DIRECTIVE_INQUISITIVE.to_string(),
            contrarian: DIRECTIVE_CONTRARIAN.to_string(),
            evasive: DIRECTIVE_EVASIVE.to_string(),
        }
    }
}

impl DirectiveTable {
    pub fn get(&self, temperament: Temperament) -> &str {
        match temperament {
            Temperament::Gentle => &self.gentle,
            Temperament::Inquisitive => &self.inquisitive,
            Temperament::Contrarian => &self.contrarian,
            Temperament::Evasive => &self.evasive,
        }
    }

    pub fn set(&mut self, temperament: Temperament, directive: impl Into<String>) {
        let slot = match temperament {
            Temperament::Gentle => &mut self.gentle,
            Temperament::Inquisitive => &mut self.inquisitive,
            Temperament::Contrarian => &mut self.contrarian,
            Temperament::Evasive => &mut self.evasive,
        };
        *slot = directive.into();
    }
}

/// Cut `text` to at most `limit` characters.
///
/// Counts Unicode scalar values, never splits one, and ignores word
/// boundaries.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Render the full episode prompt.
pub fn render_episode_prompt(
    request: &EpisodeRequest,
    directives: &DirectiveTable,
    truncation_limit: usize,
) -> String {
    let persona = request.persona();
    let temperament = persona.guest_temperament();
    let source = truncate_chars(request.source_document_text(), truncation_limit);
    let log = if request.continuity_log().trim().is_empty() {
        EMPTY_LOG_MARKER
    } else {
        request.continuity_log()
    };

    let mut prompt = String::with_capacity(source.len() + log.len() + 1024);

    // 1 + 2
    prompt.push_str(ROLE_FRAMING);
    prompt.push_str(&format!(
        " Hãy viết kịch bản Tập {} dựa trên tài liệu được cung cấp.\n\n",
        request.episode_number()
    ));

    // 3
    prompt.push_str("NHÂN VẬT:\n");
    prompt.push_str(&format!("- {}: {}\n", persona.host_name(), HOST_FRAMING));
    prompt.push_str(&format!(
        "- {}: {} {}. {}\n\n",
        persona.guest_name(),
        GUEST_FRAMING,
        temperament.label(),
        directives.get(temperament)
    ));

    // 4
    prompt.push_str("YÊU CẦU:\n");
    for (i, rule) in REQUIREMENTS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, rule));
    }
    prompt.push('\n');

    // 5
    prompt.push_str("LOG TẬP TRƯỚC (bối cảnh tập này phải tiếp nối):\n");
    prompt.push_str(log);
    prompt.push_str("\n\n");

    // 6
    prompt.push_str("TÀI LIỆU GỐC:\n");
    prompt.push_str(source);

    prompt
}

/// Render the series-planning prompt.
///
/// The model is asked for bare JSON matching [`crate::series::SeriesPlan`].
pub fn render_series_prompt(
    source_text: &str,
    persona: &PersonaConfig,
    truncation_limit: usize,
) -> String {
    format!(
        "Hãy phân tích tài liệu sau và thiết kế một series podcast thảo luận chuyên sâu.\n\
Chủ trì bởi: {host} và {guest}.\n\n\
Chỉ trả lời bằng MỘT đối tượng JSON, không kèm giải thích, theo đúng cấu trúc:\n\
{schema}\n\n\
Nội dung tài liệu:\n{source}",
        host = persona.host_name(),
        guest = persona.guest_name(),
        schema = SERIES_SCHEMA_HINT,
        source = truncate_chars(source_text, truncation_limit),
    )
}

const SERIES_SCHEMA_HINT: &str = r#"{
  "title": "string",
  "description": "string",
  "episodes": [
    {"id": 1, "title": "string", "summary": "string", "durationEstimate": "string"}
  ]
}"#;

/// Render the prompt for one episode of an existing series plan.
///
/// The model is asked for a bare JSON array of
/// [`crate::series::ScriptLine`] objects.
pub fn render_outline_prompt(
    source_text: &str,
    plan: &SeriesPlan,
    outline: &EpisodeOutline,
    persona: &PersonaConfig,
    directives: &DirectiveTable,
    truncation_limit: usize,
) -> String {
    let temperament = persona.guest_temperament();
    let mut prompt = String::with_capacity(truncation_limit.min(source_text.len()) + 2048);

    prompt.push_str(ROLE_FRAMING);
    prompt.push_str(&format!(
        " Viết kịch bản podcast chi tiết cho tập \"{}\" thuộc series \"{}\".\n",
        outline.title, plan.title
    ));
    if !outline.summary.trim().is_empty() {
        prompt.push_str(&format!("Nội dung chính của tập: {}\n", outline.summary));
    }
    if !outline.duration_estimate.trim().is_empty() {
        prompt.push_str(&format!("Thời lượng dự kiến: {}\n", outline.duration_estimate));
    }
    prompt.push('\n');

    prompt.push_str("NHÂN VẬT:\n");
    prompt.push_str(&format!("- {}: {}\n", persona.host_name(), HOST_FRAMING));
    prompt.push_str(&format!(
        "- {}: {} {}. {}\n\n",
        persona.guest_name(),
        GUEST_FRAMING,
        temperament.label(),
        directives.get(temperament)
    ));

    prompt.push_str("YÊU CẦU ĐỊNH DẠNG:\n");
    prompt.push_str("Chỉ trả lời bằng MỘT mảng JSON, không kèm giải thích. Mỗi phần tử gồm:\n");
    prompt.push_str("1. \"time\": thời điểm ước tính (ví dụ \"00:00\", \"00:15\").\n");
    prompt.push_str(&format!(
        "2. \"speaker\": \"{}\" hoặc \"{}\".\n",
        persona.host_name(),
        persona.guest_name()
    ));
    prompt.push_str("3. \"text\": lời thoại tiếng Việt tự nhiên.\n");
    prompt.push_str(
        "4. \"emotion\": sắc thái giọng (ví dụ \"Hào hứng\", \"Suy tư\", \"Cười nhẹ\", \"Ngắt quãng\").\n\n",
    );

    prompt.push_str("TÀI LIỆU GỐC:\n");
    prompt.push_str(truncate_chars(source_text, truncation_limit));
    prompt
}
