//! Keyword intent classifier for typed or transcribed commands.
//!
//! Every rule is a case-insensitive regex over the cleaned transcript. All
//! rules are tried; the highest-scoring one that yields an intent wins.
//! Anchored rules that cover the whole transcript score 1.0, loose keyword
//! rules score by how much of the transcript they cover, so rambling input
//! falls under the loop's confidence threshold and gets a help response.

use action_locator::TargetDescriptor;
use action_primitives::{ScrollDirection, TypedText};
use agent_core::{AgentError, ClassifiedIntent, Intent, IntentClassifier};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Match, Regex};
use tracing::debug;

type Build = fn(&Captures<'_>) -> Option<Intent>;

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: Build,
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let table: [(&'static str, &'static str, Build); 17] = [
        ("stop", r"^(?:stop|halt|abort|quit|be quiet)$", stop),
        (
            "cancel",
            r"^(?:cancel|never ?mind|no|don't|do not)(?: (?:it|that))?$",
            cancel,
        ),
        (
            "confirm",
            r"^(?:confirm|yes|yeah|yep|ok|okay|sure|do it|go ahead)(?: please)?$",
            confirm,
        ),
        (
            "help",
            r"^(?:help|what can (?:i|you) (?:say|do)|how does this work)$",
            help,
        ),
        ("back", r"^(?:(?:go )?back|previous page)$", back),
        ("forward", r"^(?:(?:go )?forward|next page)$", forward),
        (
            "what_changed",
            r"^(?:what (?:changed|is new|happened)|what's new|what just happened|any changes)$",
            what_changed,
        ),
        (
            "describe",
            r"^(?:(?:describe|read|summari[sz]e)(?: (?:this|the) (?:page|screen))?|(?:what is|what's|tell me what is) on (?:this|the) (?:page|screen)|where am i)$",
            describe,
        ),
        ("scroll", r"^scroll (?:to the )?(up|down|top|bottom)$", scroll),
        (
            "select",
            r"^(?:(?:number|option|choice|pick|choose|select) )?(?:the )?([a-z0-9]+)(?: one)?$",
            select,
        ),
        (
            "navigate",
            r"^(?:go to|navigate to|visit|open|browse to|take me to|load) (\S+)$",
            navigate,
        ),
        (
            "list",
            r"^(?:list|show(?: me)?|read|what are)(?: all)?(?: the)? ([a-z ]+?)(?: on (?:this|the) page)?$",
            list,
        ),
        (
            "type",
            r#"^(?:type|enter|write|input|fill in) (?:"([^"]+)"|'([^']+)'|(.+?))(?: (?:in|into) (?:the )?(.+?))?$"#,
            type_text,
        ),
        ("submit", r"^(?:submit|send)(?: (?:the )?(.+))?$", submit),
        (
            "click",
            r"^(?:click|press|tap|hit|push|activate|select|choose|open|follow)(?: on)? (.+)$",
            click,
        ),
        ("click_loose", r"\b(?:click|press|tap)(?: on)? (.+)$", click),
        (
            "navigate_loose",
            r"\b(?:go to|navigate to|visit) (\S+\.\S+)",
            navigate,
        ),
    ];
    table
        .into_iter()
        .filter_map(|(name, pattern, build)| {
            Regex::new(&format!("(?i){pattern}"))
                .ok()
                .map(|pattern| Rule {
                    name,
                    pattern,
                    build,
                })
        })
        .collect()
});

/// Words that name an element role when they end a target phrase.
const TWO_WORD_ROLES: &[(&str, &str)] = &[
    ("search box", "searchbox"),
    ("search field", "searchbox"),
    ("text field", "textbox"),
    ("text box", "textbox"),
    ("check box", "checkbox"),
    ("combo box", "combobox"),
    ("drop down", "combobox"),
    ("radio button", "radio"),
    ("menu item", "menuitem"),
];

const ROLE_WORDS: &[&str] = &[
    "button", "link", "field", "box", "input", "textbox", "searchbox", "checkbox", "combobox",
    "dropdown", "tab", "heading", "image", "menu", "option", "radio", "slider", "switch",
];

const ARTICLES: &[&str] = &["the", "a", "an"];

/// Regex classifier used by the REPL and script replay.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classifies without going through the async port.
    pub fn classify_text(&self, transcript: &str) -> ClassifiedIntent {
        let text = clean(transcript);
        if text.is_empty() {
            return ClassifiedIntent::new(Intent::Help, 0.0);
        }

        let mut best: Option<(&'static str, Intent, f64)> = None;
        for rule in RULES.iter() {
            let Some(captures) = rule.pattern.captures(&text) else {
                continue;
            };
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let Some(intent) = (rule.build)(&captures) else {
                continue;
            };
            let score = confidence(whole, &text);
            if best.as_ref().map_or(true, |(_, _, top)| score > *top) {
                best = Some((rule.name, intent, score));
            }
        }

        match best {
            Some((rule, intent, score)) => {
                debug!(rule, intent = intent.name(), confidence = score, "transcript classified");
                ClassifiedIntent::new(intent, score)
            }
            None => {
                debug!("no rule matched transcript");
                ClassifiedIntent::new(Intent::Help, 0.0)
            }
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, transcript: &str) -> Result<ClassifiedIntent, AgentError> {
        Ok(self.classify_text(transcript))
    }
}

/// Collapses whitespace and drops trailing sentence punctuation.
fn clean(transcript: &str) -> String {
    let collapsed = transcript.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_string()
}

fn confidence(found: Match<'_>, text: &str) -> f64 {
    if found.start() == 0 && found.end() == text.len() {
        return 1.0;
    }
    let mut score = found.as_str().len() as f64 / text.len().max(1) as f64;
    if found.start() == 0 {
        score += 0.2;
    }
    let starts_word = found.start() == 0 || text[..found.start()].ends_with(' ');
    let ends_word = found.end() == text.len() || text[found.end()..].starts_with(' ');
    if starts_word && ends_word {
        score += 0.1;
    }
    score.min(1.0)
}

fn group<'t>(captures: &Captures<'t>, index: usize) -> Option<&'t str> {
    captures
        .get(index)
        .map(|found| found.as_str().trim())
        .filter(|value| !value.is_empty())
}

fn stop(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::Stop)
}

fn cancel(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::Cancel)
}

fn confirm(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::Confirm)
}

fn help(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::Help)
}

fn back(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::Back)
}

fn forward(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::Forward)
}

fn what_changed(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::WhatChanged)
}

fn describe(_: &Captures<'_>) -> Option<Intent> {
    Some(Intent::Describe)
}

fn scroll(captures: &Captures<'_>) -> Option<Intent> {
    let direction = match group(captures, 1)?.to_ascii_lowercase().as_str() {
        "up" => ScrollDirection::Up,
        "down" => ScrollDirection::Down,
        "top" => ScrollDirection::Top,
        "bottom" => ScrollDirection::Bottom,
        _ => return None,
    };
    Some(Intent::Scroll { direction })
}

fn select(captures: &Captures<'_>) -> Option<Intent> {
    let index = number_word(group(captures, 1)?)?;
    Some(Intent::SelectOrdinal { index })
}

fn navigate(captures: &Captures<'_>) -> Option<Intent> {
    let raw = group(captures, 1)?.trim_end_matches('.');
    if !raw.contains('.') {
        return None;
    }
    Some(Intent::Navigate {
        url: normalize_url(raw),
    })
}

fn list(captures: &Captures<'_>) -> Option<Intent> {
    let what = group(captures, 1)?.to_ascii_lowercase();
    let role = match what.as_str() {
        "everything" | "elements" | "controls" | "things" | "options here" => None,
        _ => Some(what),
    };
    Some(Intent::ListElements { role })
}

fn type_text(captures: &Captures<'_>) -> Option<Intent> {
    let text = group(captures, 1)
        .or_else(|| group(captures, 2))
        .or_else(|| group(captures, 3))?;
    let target = group(captures, 4).and_then(parse_target);
    Some(Intent::Type {
        target,
        text: TypedText::from(text),
    })
}

fn submit(captures: &Captures<'_>) -> Option<Intent> {
    let target = match group(captures, 1) {
        None => None,
        Some(rest) if matches!(rest.to_ascii_lowercase().as_str(), "form" | "it" | "this") => None,
        Some(rest) => Some(parse_target(rest)?),
    };
    Some(Intent::Submit { target })
}

fn click(captures: &Captures<'_>) -> Option<Intent> {
    let target = parse_target(group(captures, 1)?)?;
    Some(Intent::Click { target })
}

/// Parses "the second Add to cart button under Blue mug" into a descriptor.
pub fn parse_target(phrase: &str) -> Option<TargetDescriptor> {
    static HINT: Lazy<Option<Regex>> = Lazy::new(|| {
        Regex::new(r"(?i)^(.+?) (?:under|below|near|inside|in the) (.+)$").ok()
    });

    let (main, hint) = match HINT.as_ref().and_then(|regex| regex.captures(phrase)) {
        Some(captures) => (
            group(&captures, 1).unwrap_or(phrase),
            group(&captures, 2),
        ),
        None => (phrase, None),
    };

    let mut words: Vec<&str> = main.split_whitespace().collect();
    while words
        .first()
        .is_some_and(|word| ARTICLES.contains(&word.to_ascii_lowercase().as_str()))
    {
        words.remove(0);
    }

    let mut descriptor = TargetDescriptor::new();
    if let Some(ordinal) = words.first().and_then(|word| ordinal_word(word)) {
        descriptor.ordinal = Some(ordinal);
        words.remove(0);
    }

    let lowered: Vec<String> = words.iter().map(|word| word.to_ascii_lowercase()).collect();
    if lowered.len() >= 2 {
        let tail = format!("{} {}", lowered[lowered.len() - 2], lowered[lowered.len() - 1]);
        if let Some((_, role)) = TWO_WORD_ROLES.iter().find(|(spoken, _)| *spoken == tail) {
            descriptor.role = Some((*role).to_string());
            words.truncate(words.len() - 2);
        }
    }
    if descriptor.role.is_none() {
        if let Some(last) = lowered.last() {
            if ROLE_WORDS.contains(&last.as_str()) {
                descriptor.role = Some(last.clone());
                words.pop();
            }
        }
    }

    let name = words.join(" ");
    if !name.is_empty() {
        descriptor.name = Some(name);
    }
    if let Some(hint) = hint {
        descriptor.hint = Some(hint.to_string());
    }
    if descriptor.name.is_none() && descriptor.role.is_none() {
        return None;
    }
    Some(descriptor)
}

/// "3", "three", "third" or "3rd".
fn number_word(word: &str) -> Option<usize> {
    let lowered = word.to_ascii_lowercase();
    if let Ok(value) = lowered.parse::<usize>() {
        return (value > 0).then_some(value);
    }
    const CARDINALS: [&str; 10] = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    CARDINALS
        .iter()
        .position(|cardinal| *cardinal == lowered)
        .map(|idx| idx + 1)
        .or_else(|| ordinal_word(&lowered))
}

fn ordinal_word(word: &str) -> Option<usize> {
    const ORDINALS: [&str; 10] = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth",
    ];
    let lowered = word.to_ascii_lowercase();
    if let Some(idx) = ORDINALS.iter().position(|ordinal| *ordinal == lowered) {
        return Some(idx + 1);
    }
    let digits = lowered
        .strip_suffix("st")
        .or_else(|| lowered.strip_suffix("nd"))
        .or_else(|| lowered.strip_suffix("rd"))
        .or_else(|| lowered.strip_suffix("th"))?;
    digits.parse::<usize>().ok().filter(|value| *value > 0)
}

fn normalize_url(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}
