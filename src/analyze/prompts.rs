// src/analyze/prompts.rs
//! Prompt text for the three analysis modes. The response shape itself travels separately as
//! `responseSchema`, so prompts only describe intent.

use crate::ingest::types::Signal;

const ANALYST: &str = "You are a supply chain intelligence analyst.";

pub fn analyze_event(signal: &Signal) -> String {
    let summary = if signal.summary.is_empty() {
        "(none)"
    } else {
        signal.summary.as_str()
    };
    format!(
        "{ANALYST} Assess the supply chain risk of this event.\n\n\
         Headline: {headline}\n\
         Location: {location}\n\
         Summary: {summary}\n\n\
         Return JSON only. risk_score is an integer from 1 (negligible) to 10 (severe). \
         category is one of Disruption, Construction, Shortage, Manufacturing, Geopolitical. \
         List the affected industries, the regions the impact ripples into, a short, medium and \
         long term outlook (1-7 days, 1-4 weeks, 1-6 months), 2-3 sentences of reasoning and \
         what to monitor next. Set construction_related, and when true, say what is being built \
         in construction_prediction.",
        headline = signal.headline,
        location = signal.location_hint.as_deref().unwrap_or("Unknown"),
    )
}

pub fn executive_brief(context: &str) -> String {
    format!(
        "{ANALYST} Based on these current signals, write an executive brief.\n\n\
         CURRENT EVENTS ([risk/5] headline | category | location):\n{context}\n\n\
         Return JSON only: summary is 2-4 sentences on the overall supply chain picture and \
         what stands out; top_risks is exactly 3 items, highest risk first, one sentence each."
    )
}

pub fn ask(context: &str, question: &str) -> String {
    format!(
        "{ANALYST} Answer the user's question using ONLY the following current events. \
         Be concise (2-5 sentences). If the data does not support an answer, say so.\n\n\
         CURRENT EVENTS ([risk/5] headline | category | location):\n{context}\n\n\
         USER QUESTION: {question}\n\n\
         Return JSON only, with the reply in answer.",
        question = question.trim(),
    )
}
