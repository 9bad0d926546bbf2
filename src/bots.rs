use serde::Serialize;

/// Known AI crawler user-agent tokens and the product they crawl for.
///
/// The order matters: classification walks the list top to bottom and the
/// first token found in the user agent wins. Matching is case-sensitive,
/// and the served tracker snippet embeds this same list in the same order,
/// so client-side detection and server-side classification cannot drift.
pub const AI_BOTS: &[(&str, &str)] = &[
    ("GPTBot", "OpenAI Training"),
    ("ChatGPT-User", "OpenAI Real-time"),
    ("OAI-SearchBot", "OpenAI Search"),
    ("ClaudeBot", "Anthropic Claude"),
    ("PerplexityBot", "Perplexity AI"),
    ("Google-Extended", "Google Gemini"),
    ("BingBot", "Microsoft Bing"),
    ("Amazonbot", "Amazon Alexa"),
    ("anthropic-ai", "Anthropic Research"),
    ("cohere-ai", "Cohere AI"),
    ("AI2Bot", "Allen Institute"),
    ("CCBot", "Common Crawl"),
    ("Bytespider", "ByteDance TikTok"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BotMatch {
    pub name: &'static str,
    pub description: &'static str,
}

/// Returns the first table entry whose token appears in the user agent,
/// or `None` when no AI bot is detected.
pub fn classify_user_agent(user_agent: &str) -> Option<BotMatch> {
    AI_BOTS
        .iter()
        .find(|(token, _)| user_agent.contains(token))
        .map(|&(name, description)| BotMatch { name, description })
}
