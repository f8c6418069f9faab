/// A parsed chat command. Immutable once built; constructed purely from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/deploy <code>` — deploy the given code as-is.
    Deploy { code: String },
    /// `/access <url...>` — run accessibility checks on the given URLs.
    AccessibilityCheck { urls: Vec<String> },
    /// `/login` — request an account-link URL.
    Login,
    /// `/agentic ...` — structured codegen request.
    Agentic(AgenticRequest),
    /// `/help`, or any command whose payload was unusable.
    Help,
    /// Anything else: treated as a natural-language prompt.
    Freeform(String),
}

/// Action keyword for an agentic request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgenticAction {
    #[default]
    Editar,
    Focar,
    Gerar,
}

impl AgenticAction {
    fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "EDITAR" => Some(Self::Editar),
            "FOCAR" => Some(Self::Focar),
            "GERAR" => Some(Self::Gerar),
            _ => None,
        }
    }

    /// The wire keyword sent to the codegen tool.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Editar => "EDITAR",
            Self::Focar => "FOCAR",
            Self::Gerar => "GERAR",
        }
    }
}

/// Payload of an `/agentic` command.
///
/// Grammar: `<ACTION> <tenantHint> | [<fileName> |] <prompt> [|| <currentCode>]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgenticRequest {
    pub action: AgenticAction,
    pub tenant_hint: String,
    pub file_name: Option<String>,
    pub prompt: String,
    pub current_code: Option<String>,
}

/// Usage text sent for `/help` and for commands with unusable payloads.
pub const USAGE: &str = "Available commands:\n\
    /deploy <code> — deploy code directly\n\
    /access <url...> — run accessibility checks\n\
    /login — link your account\n\
    /agentic ACTION tenant | [file |] prompt [|| current code]\n\
    /help — show this help\n\
    Or just describe the app you want and I'll build and deploy it.";

/// Parse chat text into a [`Command`]. Never fails; precedence is
/// `/deploy`, `/access`, `/login`, `/agentic`, `/help`, then freeform.
/// Prefixes are case-insensitive.
#[must_use]
pub fn parse(text: &str) -> Command {
    let trimmed = text.trim();

    if let Some(rest) = strip_command(trimmed, "/deploy") {
        let code = rest.trim();
        if code.is_empty() {
            return Command::Help;
        }
        return Command::Deploy { code: code.into() };
    }

    if let Some(rest) = strip_command(trimmed, "/access") {
        let urls: Vec<String> = rest.split_whitespace().map(String::from).collect();
        if urls.is_empty() {
            return Command::Help;
        }
        return Command::AccessibilityCheck { urls };
    }

    if strip_command(trimmed, "/login").is_some() {
        return Command::Login;
    }

    if let Some(rest) = strip_command(trimmed, "/agentic") {
        return parse_agentic(rest);
    }

    if strip_command(trimmed, "/help").is_some() {
        return Command::Help;
    }

    Command::Freeform(text.to_string())
}

/// Case-insensitive command-prefix match. The prefix must be followed by
/// whitespace or end-of-input, so `/deployment plan` stays freeform.
fn strip_command<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &text[prefix.len()..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Parse the `/agentic` payload.
///
/// The split on `||` happens first and only once, so any `|` embedded in the
/// current-code section survives verbatim.
fn parse_agentic(payload: &str) -> Command {
    let (left, current_code) = match payload.split_once("||") {
        Some((l, r)) => {
            let code = r.trim();
            (l, (!code.is_empty()).then(|| code.to_string()))
        },
        None => (payload, None),
    };

    let fields: Vec<&str> = left
        .split('|')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    // Field 1 is the header, the last field is the prompt; a prompt only
    // exists when there are at least two fields.
    if fields.len() < 2 {
        return Command::Help;
    }

    let (action, tenant_hint) = parse_header(fields[0]);
    let file_name = (fields.len() >= 3).then(|| fields[1].to_string());
    let prompt = fields[fields.len() - 1].to_string();

    Command::Agentic(AgenticRequest {
        action,
        tenant_hint,
        file_name,
        prompt,
        current_code,
    })
}

/// Parse `"<ACTION> <tenantHint>"`. A missing action keyword defaults to
/// EDITAR, in which case the whole header is the tenant hint.
fn parse_header(header: &str) -> (AgenticAction, String) {
    let mut words = header.split_whitespace();
    match words.next().and_then(AgenticAction::from_keyword) {
        Some(action) => (action, words.collect::<Vec<_>>().join(" ")),
        None => (AgenticAction::default(), header.to_string()),
    }
}
