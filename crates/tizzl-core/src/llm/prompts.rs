//! Prompt templates for query enhancement and reranking

use crate::search::Candidate;

pub(crate) const QUERY_MARKER: &str = "QUERY:";
pub(crate) const PRODUCTS_MARKER: &str = "PRODUCTS:";
pub(crate) const ID_PREFIX: &str = "- ID: ";

pub const ENHANCEMENT_SYSTEM_PROMPT: &str =
    "You are a fashion search expert. Extract relevant search terms.";

pub const RERANKING_SYSTEM_PROMPT: &str =
    "You are a fashion expert who ranks products by relevance. \
     Output ONLY JSON: {\"ranking\": [\"<product id>\", ...]}";

/// Instruction asking for a short keyword list for one styling request
pub fn build_enhancement_prompt(query: &str) -> String {
    format!(
        r#"Extract and enhance search keywords from this fashion query:

{} {}

Identify:
1. Specific product types mentioned
2. Colors, patterns, or materials
3. Occasions or use cases
4. Style preferences (casual, formal, trendy, classic, etc.)
5. Any implicit requirements (weather, season, formality level)

Return a short list of search terms, one per line, that would help find relevant products.
Include synonyms and related terms."#,
        QUERY_MARKER, query
    )
}

/// Compact one-line description of a candidate for the reranking prompt
pub fn describe_candidate(candidate: &Candidate) -> String {
    let meta = &candidate.metadata;
    let mut line = format!(
        "{}{} | {} | {} | ${:.2}",
        ID_PREFIX,
        candidate.product_id,
        meta.name,
        meta.category,
        meta.display_price()
    );
    if !meta.colors.is_empty() {
        line.push_str(&format!(" | colors: {}", meta.colors.join(", ")));
    }
    if let Some(ref brand) = meta.brand {
        line.push_str(&format!(" | brand: {}", brand));
    }
    if !meta.occasions.is_empty() {
        line.push_str(&format!(" | occasions: {}", meta.occasions.join(", ")));
    }
    line
}

/// Instruction asking for candidate ids in decreasing relevance
pub fn build_reranking_prompt(query: &str, candidates: &[Candidate]) -> String {
    let products: Vec<String> = candidates.iter().map(describe_candidate).collect();

    format!(
        r#"Rank these products by relevance to the user's query:

{} {}

{}
{}

Consider:
1. Direct relevance to the query
2. Style appropriateness
3. Versatility and outfit potential
4. Value for money

Return every product ID from most to least relevant as JSON:
{{"ranking": ["<id>", "<id>", ...]}}"#,
        QUERY_MARKER,
        query,
        PRODUCTS_MARKER,
        products.join("\n")
    )
}
