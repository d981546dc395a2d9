use chrono::{Datelike, Utc};

/// Headings every synthesized report is asked to contain, in order.
pub const REPORT_SECTIONS: [&str; 8] = [
    "Executive Summary",
    "Introduction to the Legal Topic",
    "Relevant Statutory Provisions",
    "Key Case Law and Precedents",
    "Legal Analysis",
    "Practical Applications",
    "Recommendations",
    "Conclusion",
];

fn current_year() -> i32 {
    Utc::now().year()
}

// ── System prompts ───────────────────────────────────────────────────────

pub fn planning_system() -> String {
    format!(
        "You are a legal research planner specialising in Indian law. The current year is {}.\n\
         Write web search queries that together cover the topic: different aspects of it, \
         precise Indian legal terminology (statutes, sections, courts), and authoritative sources. \
         Address every clarification the user gave.\n\
         Respond only with JSON: {{\"queries\": [\"...\", \"...\", \"...\"]}} containing exactly 3 queries.",
        current_year()
    )
}

pub const EXTRACTION_SYSTEM: &str = "\
You extract legal information from web content for a research report on Indian law.
Keep only what is relevant to the topic: statutory provisions with section numbers, \
case names with full citations, court names, dates, and procedural requirements. \
Preserve legal terminology exactly. Drop boilerplate and repetition.
If nothing in the content is relevant, answer with the single word NONE.";

pub fn analysis_system() -> String {
    format!(
        "You are a legal research analyst specialising in Indian law. The current year is {}.\n\
         Decide whether the collected content is enough to write a useful legal report. \
         Enough means: the core statutory provisions and leading case law are covered with citations, \
         the user's clarifications can be answered, and both principle and practice are addressed. \
         Be practical: a useful report does not need perfect coverage. \
         Become more lenient as the iteration count approaches the limit.\n\
         Respond only with JSON:\n\
         {{\"sufficient\": true|false, \"confidence\": 0.0-1.0, \
         \"gaps\": [\"missing information\"], \
         \"queries\": [\"1-3 targeted search queries, empty when sufficient\"]}}",
        current_year()
    )
}

pub fn report_system() -> String {
    format!(
        "You are a legal report writer with deep knowledge of Indian law.\n\
         Write a well-structured markdown report from the research findings you are given. \
         Start with an executive summary, cite cases and statutes in Indian citation format, \
         quote key holdings with > blocks, use tables to compare positions, and end with \
         practical recommendations. Use only the findings; say so where they are silent.\n\
         Use these top-level sections in order: {}.\n\
         Wrap the final report in <report></report> tags.",
        REPORT_SECTIONS.join(", ")
    )
}

pub const CLARIFICATION_SYSTEM: &str = "\
You help a lawyer scope a legal research request on Indian law.
Ask the few questions whose answers would most change the research: jurisdiction, \
court or forum, the client's position, relevant dates, and the intended use of the report.
Respond only with JSON: {\"questions\": [\"...\"]} with at most 5 short questions.";

pub const PRECEDENT_SYSTEM: &str = "\
You are a legal researcher. For each relevant case in the search results give: \
case name and citation, key facts, the court's ruling and reasoning, how it applies \
to the query, and its jurisdiction and binding authority. Skip irrelevant results.";

// ── User prompts ─────────────────────────────────────────────────────────

pub fn planning_prompt(topic: &str, clarifications: &str) -> String {
    format!(
        "Research topic:\n<topic>{topic}</topic>\n\n\
         Clarifications:\n<clarifications>{clarifications}</clarifications>\n\n\
         Write the search queries."
    )
}

pub fn extraction_prompt(topic: &str, url: &str, content: &str) -> String {
    format!(
        "Extract the information relevant to this legal topic:\n<topic>{topic}</topic>\n\n\
         Content from {url}:\n<content>{content}</content>"
    )
}

#[allow(clippy::too_many_arguments)]
pub fn analysis_prompt(
    topic: &str,
    clarifications: &str,
    content: &str,
    previous_queries: &[String],
    iteration: u32,
    max_iterations: u32,
    findings: usize,
) -> String {
    let mut s = format!(
        "Topic: <topic>{topic}</topic>\n\n\
         Clarifications:\n<clarifications>{clarifications}</clarifications>\n\n\
         Content:\n<content>{content}</content>\n\n\
         Previous queries:\n<previousQueries>{}</previousQueries>\n\n\
         Research state:\n\
         - Iteration {iteration} of at most {max_iterations}\n\
         - {findings} findings collected, {} characters of content",
        previous_queries.join(", "),
        content.chars().count(),
    );
    if iteration + 1 >= max_iterations {
        s.push_str(
            "\n- This is the last chance to search again; prefer declaring the content \
             sufficient unless a core aspect is missing entirely",
        );
    }
    s
}

pub fn report_prompt(topic: &str, clarifications: &str, findings: &str) -> String {
    format!(
        "Write a comprehensive legal report on:\n<topic>{topic}</topic>\n\n\
         Clarifications to address:\n<clarifications>{clarifications}</clarifications>\n\n\
         Research findings:\n<research_findings>{findings}</research_findings>\n\n\
         Cover the current legal position in India, landmark judgments and their implications, \
         procedural requirements and timelines, recent amendments, and common practical challenges."
    )
}

pub fn clarification_prompt(topic: &str) -> String {
    format!("The lawyer wants research on:\n<topic>{topic}</topic>")
}

pub fn precedent_prompt(query: &str, results: &str) -> String {
    format!(
        "Query: \"{query}\"\n\nSearch results:\n{results}\n\n\
         Summarise each relevant precedent and how it applies to the query."
    )
}
