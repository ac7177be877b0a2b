//! Builtin name tables and "Did you mean ...?" suggestions.

use crate::error::Diagnostic;
use crate::token::Token;

/// The six world-mutating builtin commands, in opcode order.
pub const BUILTIN_COMMANDS: [&str; 6] = [
    "moveForward",
    "turnLeft",
    "turnAround",
    "turnRight",
    "pickBeeper",
    "dropBeeper",
];

/// Everything that may appear as a primary condition.
pub const PREDICATES: [&str; 7] = [
    "false",
    "true",
    "onBeeper",
    "beeperAhead",
    "leftIsClear",
    "frontIsClear",
    "rightIsClear",
];

const MAX_SUGGESTIONS: usize = 5;

/// Classic Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// All candidates sharing the smallest edit distance to `word`, sorted and
/// capped at a handful.
///
/// ```rust
/// use karel_syntax::suggest::best_matches;
///
/// assert_eq!(best_matches("onBeper", ["onBeeper", "beeperAhead"]), ["onBeeper"]);
/// assert_eq!(best_matches("c", ["a", "b", "cc"]), ["a", "b", "cc"]);
/// ```
pub fn best_matches<'a>(word: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut best = usize::MAX;
    let mut matches: Vec<&str> = Vec::new();
    for candidate in candidates {
        let distance = edit_distance(word, candidate);
        if distance < best {
            best = distance;
            matches.clear();
        }
        if distance == best && !matches.contains(&candidate) {
            matches.push(candidate);
        }
    }
    matches.sort_unstable();
    matches.truncate(MAX_SUGGESTIONS);
    matches.into_iter().map(str::to_owned).collect()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Builds the diagnostic for an unknown name at `token`.
///
/// A single best match highlights only the part of the word that differs
/// from it; several equally good matches are listed comma separated.
/// `headline`, when given, precedes the suggestion on its own paragraph.
pub fn did_you_mean<'a>(
    token: &Token,
    headline: Option<&str>,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Diagnostic {
    let matches = best_matches(&token.lexeme, candidates);
    let prefix = match headline {
        Some(headline) => format!("{}\n\n", headline),
        None => String::new(),
    };
    match matches.as_slice() {
        [] => Diagnostic::new(token.position, headline.unwrap_or("unknown name").to_string()),
        [single] => {
            let common = common_prefix_len(single, &token.lexeme);
            let length = token.lexeme.chars().count();
            Diagnostic::with_highlight(
                token.position + common,
                format!("{}Did you mean {}?", prefix, single),
                length.saturating_sub(common),
            )
        }
        several => Diagnostic::new(
            token.position,
            format!("{}Did you mean {}?", prefix, several.join(", ")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("turnLeft", "turnLeft"), 0);
    }

    #[test]
    fn single_match_highlights_differing_suffix() {
        let token = Token::new(TokenKind::Identifier, 10, "turnLefft");
        let diagnostic = did_you_mean(&token, None, BUILTIN_COMMANDS);
        assert_eq!(diagnostic.message, "Did you mean turnLeft?");
        assert_eq!(diagnostic.position, 17);
        assert_eq!(diagnostic.highlight_len, Some(2));
    }

    #[test]
    fn ties_are_listed() {
        let token = Token::new(TokenKind::Identifier, 3, "x");
        let diagnostic = did_you_mean(&token, Some("undefined command x"), ["b", "a"]);
        assert_eq!(diagnostic.message, "undefined command x\n\nDid you mean a, b?");
        assert_eq!(diagnostic.position, 3);
        assert_eq!(diagnostic.highlight_len, None);
    }
}
