use chrono::format::{Item, StrftimeItems};

use toydata_core::is_config_name;

use crate::errors::NotationError;
use crate::lexer::{Token, TokenKind, lex};
use crate::model::{
    ChoiceSource, ConstantRef, CountSpec, Directive, EntryKey, ObjectKey, RawType, UniqueKind,
    Verb,
};

/// Format used by `DATE` when no format clause is given.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

const OBJECT_PREFIX: &str = "object.";

/// Parse a field specification string into a [`Directive`].
///
/// Grammar: `VERB`, optionally one source clause in double brackets, optionally
/// one trailing count clause (`[N]`, `[n]` or `[[CONFIG]]`). A bare `[[...]]`
/// token is a reference substitution. Plain text without brackets that is not
/// a verb, constant or type tag is a literal string.
pub fn parse_directive(source: &str) -> Result<Directive, NotationError> {
    let tokens = lex_trimmed(source)?;

    let directive = |verb: Verb, count: Option<CountSpec>| Directive {
        verb,
        count,
        raw: source.to_string(),
    };

    let Some((head, clauses)) = tokens.split_first() else {
        return Ok(directive(
            Verb::Literal(serde_json::Value::String(source.to_string())),
            None,
        ));
    };

    match &head.kind {
        TokenKind::Double(content) => {
            let verb = parse_reference(content, head)?;
            let count = match clauses {
                [] => None,
                [count] => {
                    if !matches!(verb, Verb::ObjectRef(_)) {
                        return Err(NotationError::syntax(
                            count.text(),
                            count.position,
                            "a count clause is only allowed on object references",
                        ));
                    }
                    Some(parse_count(count)?)
                }
                [_, extra, ..] => return Err(unexpected(extra)),
            };
            Ok(directive(verb, count))
        }
        TokenKind::Single(_) => Err(NotationError::syntax(
            head.text(),
            head.position,
            "single brackets cannot start a directive; references use [[...]]",
        )),
        TokenKind::Word(word) => {
            let verb_name = word.trim();
            match verb_name {
                "UNIQUE" => {
                    let (kind, count) = parse_unique(head, clauses)?;
                    Ok(directive(Verb::Unique { kind }, count))
                }
                "CHOOSE" => {
                    let (source, count) = parse_choose(head, clauses)?;
                    Ok(directive(Verb::Choose { source }, count))
                }
                "DATE" => {
                    let (format, count) = parse_date(clauses)?;
                    Ok(directive(Verb::Date { format }, count))
                }
                _ => {
                    if let Some(constant) = ConstantRef::from_word(verb_name) {
                        let count = parse_trailing_count(clauses)?;
                        return Ok(directive(Verb::Constant { constant }, count));
                    }
                    if let Some(ty) = RawType::from_word(verb_name) {
                        let count = parse_trailing_count(clauses)?;
                        return Ok(directive(Verb::Raw { ty }, count));
                    }
                    if !clauses.is_empty() || looks_like_verb(verb_name) {
                        return Err(NotationError::syntax(
                            verb_name,
                            head.position,
                            format!("unknown verb `{verb_name}`"),
                        ));
                    }
                    Ok(directive(
                        Verb::Literal(serde_json::Value::String(source.to_string())),
                        None,
                    ))
                }
            }
        }
    }
}

/// Parse a `name[count]` key of a shared column or table.
pub fn parse_entry_key(source: &str) -> Result<EntryKey, NotationError> {
    let tokens = lex_trimmed(source)?;

    let Some((head, clauses)) = tokens.split_first() else {
        return Err(NotationError::syntax(source, 0, "empty name"));
    };
    let TokenKind::Word(word) = &head.kind else {
        return Err(NotationError::syntax(
            head.text(),
            head.position,
            "entry keys must start with a name",
        ));
    };
    let name = word.trim();
    if !is_identifier(name) {
        return Err(NotationError::syntax(
            name,
            head.position,
            format!("`{name}` is not a valid name"),
        ));
    }

    let rows = match clauses {
        [] => None,
        [count] => match parse_count(count)? {
            CountSpec::Random => {
                return Err(NotationError::syntax(
                    count.text(),
                    count.position,
                    "`n` cannot be used as a row count",
                ));
            }
            spec => Some(spec),
        },
        [_, extra, ..] => return Err(unexpected(extra)),
    };

    Ok(EntryKey {
        name: name.to_string(),
        rows,
    })
}

/// Parse a base-object reference: `ns.name`, `object.ns.name` or
/// `[[object.ns.name]]`.
pub fn parse_object_key(source: &str) -> Result<ObjectKey, NotationError> {
    let tokens = lex_trimmed(source)?;
    let (content, position) = match tokens.as_slice() {
        [token] => match &token.kind {
            TokenKind::Word(word) => (word.trim(), token.position),
            TokenKind::Double(content) => (content.trim(), token.position),
            TokenKind::Single(_) => {
                return Err(NotationError::syntax(
                    token.text(),
                    token.position,
                    "object references use double brackets",
                ));
            }
        },
        [] => return Err(NotationError::syntax(source, 0, "empty object reference")),
        [_, extra, ..] => return Err(unexpected(extra)),
    };

    let path = content.strip_prefix(OBJECT_PREFIX).unwrap_or(content);
    object_key_from_path(path).ok_or_else(|| {
        NotationError::syntax(
            content,
            position,
            "object references have the form object.<namespace>.<name>",
        )
    })
}

fn parse_reference(content: &str, token: &Token) -> Result<Verb, NotationError> {
    let content = content.trim();

    if let Some(path) = content.strip_prefix(OBJECT_PREFIX) {
        return object_key_from_path(path)
            .map(Verb::ObjectRef)
            .ok_or_else(|| {
                NotationError::syntax(
                    token.text(),
                    token.position,
                    "object references have the form object.<namespace>.<name>",
                )
            });
    }
    if content.parse::<i64>().is_ok() || content == "n" {
        return Err(NotationError::syntax(
            token.text(),
            token.position,
            "double brackets cannot hold a literal count; use single brackets",
        ));
    }
    if is_config_name(content) {
        return Ok(Verb::ConfigRef(content.to_string()));
    }
    if is_identifier(content) {
        return Ok(Verb::SharedRef(content.to_string()));
    }
    Err(NotationError::syntax(
        token.text(),
        token.position,
        "double brackets must name a config variable, shared column or object",
    ))
}

fn parse_unique(
    head: &Token,
    clauses: &[Token],
) -> Result<(UniqueKind, Option<CountSpec>), NotationError> {
    let Some((tag, rest)) = clauses.split_first() else {
        return Err(NotationError::syntax(
            "UNIQUE",
            head.position,
            "UNIQUE requires a type tag: UNIQUE[int] or UNIQUE[str]",
        ));
    };
    let kind = match &tag.kind {
        TokenKind::Single(content) => match content.trim() {
            "int" => UniqueKind::Int,
            "str" => UniqueKind::Str,
            other => {
                return Err(NotationError::syntax(
                    tag.text(),
                    tag.position,
                    format!("unknown UNIQUE type tag `{other}`; expected int or str"),
                ));
            }
        },
        TokenKind::Double(_) => {
            return Err(NotationError::syntax(
                tag.text(),
                tag.position,
                "UNIQUE type tags use single brackets",
            ));
        }
        TokenKind::Word(_) => return Err(unexpected(tag)),
    };
    Ok((kind, parse_trailing_count(rest)?))
}

fn parse_choose(
    head: &Token,
    clauses: &[Token],
) -> Result<(ChoiceSource, Option<CountSpec>), NotationError> {
    let Some((source, rest)) = clauses.split_first() else {
        return Err(NotationError::syntax(
            "CHOOSE",
            head.position,
            "CHOOSE requires a source: CHOOSE[[a,b,c]] or CHOOSE[[lo-hi]]",
        ));
    };
    let source = match &source.kind {
        TokenKind::Double(content) => parse_choice_source(content, source)?,
        TokenKind::Single(_) => {
            return Err(NotationError::syntax(
                source.text(),
                source.position,
                "CHOOSE sources use double brackets",
            ));
        }
        TokenKind::Word(_) => return Err(unexpected(source)),
    };
    Ok((source, parse_trailing_count(rest)?))
}

fn parse_choice_source(content: &str, token: &Token) -> Result<ChoiceSource, NotationError> {
    let content = content.trim();

    if content.contains(',') {
        let mut items = Vec::new();
        for item in content.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(NotationError::syntax(
                    token.text(),
                    token.position,
                    "empty item in choice list",
                ));
            }
            items.push(item.to_string());
        }
        return Ok(ChoiceSource::List(items));
    }

    if let Some((lo, hi)) = parse_range(content, token)? {
        if hi < lo {
            return Err(NotationError::syntax(
                token.text(),
                token.position,
                format!("inverted range: {hi} is lower than {lo}"),
            ));
        }
        return Ok(ChoiceSource::Range { lo, hi });
    }

    if is_identifier(content) {
        return Ok(ChoiceSource::Named(content.to_string()));
    }

    Ok(ChoiceSource::List(vec![content.to_string()]))
}

/// Content made of digits, dashes and spaces only must be a `LO-HI` range.
fn parse_range(content: &str, token: &Token) -> Result<Option<(i64, i64)>, NotationError> {
    let range_shaped = content.contains('-')
        && content.chars().any(|c| c.is_ascii_digit())
        && content
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c.is_whitespace());
    if !range_shaped {
        return Ok(None);
    }

    let malformed = || {
        NotationError::syntax(
            token.text(),
            token.position,
            format!("malformed range `{content}`: expected LO-HI with non-negative integers"),
        )
    };
    let (lo, hi) = content.split_once('-').ok_or_else(malformed)?;
    let (lo, hi) = (lo.trim(), hi.trim());
    let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !digits(lo) || !digits(hi) {
        return Err(malformed());
    }

    let endpoint = |part: &str| {
        part.parse::<i64>().map_err(|_| {
            NotationError::syntax(
                token.text(),
                token.position,
                format!("range endpoint `{part}` does not fit a 64-bit integer"),
            )
        })
    };
    Ok(Some((endpoint(lo)?, endpoint(hi)?)))
}

fn parse_date(clauses: &[Token]) -> Result<(String, Option<CountSpec>), NotationError> {
    match clauses {
        [] => Ok((DEFAULT_DATE_FORMAT.to_string(), None)),
        [only] if is_count_clause(only) => {
            Ok((DEFAULT_DATE_FORMAT.to_string(), Some(parse_count(only)?)))
        }
        [format, rest @ ..] => {
            let TokenKind::Single(content) = &format.kind else {
                return Err(NotationError::syntax(
                    format.text(),
                    format.position,
                    "DATE formats use single brackets",
                ));
            };
            validate_date_format(content, format)?;
            Ok((content.clone(), parse_trailing_count(rest)?))
        }
    }
}

fn validate_date_format(format: &str, token: &Token) -> Result<(), NotationError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(NotationError::syntax(
            token.text(),
            token.position,
            "invalid DATE format",
        ));
    }
    Ok(())
}

fn is_count_clause(token: &Token) -> bool {
    match &token.kind {
        TokenKind::Single(content) => {
            let content = content.trim();
            content == "n" || content.parse::<i64>().is_ok()
        }
        TokenKind::Double(content) => is_config_name(content.trim()),
        TokenKind::Word(_) => false,
    }
}

fn parse_trailing_count(clauses: &[Token]) -> Result<Option<CountSpec>, NotationError> {
    match clauses {
        [] => Ok(None),
        [count] => parse_count(count).map(Some),
        [_, extra, ..] => Err(unexpected(extra)),
    }
}

fn parse_count(token: &Token) -> Result<CountSpec, NotationError> {
    match &token.kind {
        TokenKind::Single(content) => {
            let content = content.trim();
            if content == "n" {
                return Ok(CountSpec::Random);
            }
            if let Ok(value) = content.parse::<i64>() {
                if value <= 0 {
                    return Err(NotationError::cardinality(
                        token.text(),
                        "counts must be at least 1",
                    ));
                }
                return Ok(CountSpec::Literal(value as u64));
            }
            if is_config_name(content) {
                return Err(NotationError::syntax(
                    token.text(),
                    token.position,
                    format!("config variables use double brackets: [[{content}]]"),
                ));
            }
            Err(NotationError::syntax(
                token.text(),
                token.position,
                "count must be an integer or `n`",
            ))
        }
        TokenKind::Double(content) => {
            let content = content.trim();
            if content.parse::<i64>().is_ok() || content == "n" {
                return Err(NotationError::syntax(
                    token.text(),
                    token.position,
                    format!("double brackets cannot hold a literal count; use [{content}]"),
                ));
            }
            if is_config_name(content) {
                return Ok(CountSpec::Config(content.to_string()));
            }
            Err(NotationError::syntax(
                token.text(),
                token.position,
                "count references must name a config variable",
            ))
        }
        TokenKind::Word(_) => Err(unexpected(token)),
    }
}

fn object_key_from_path(path: &str) -> Option<ObjectKey> {
    let mut parts = path.split('.');
    let namespace = parts.next()?;
    let name = parts.next()?;
    if parts.next().is_some() || !is_identifier(namespace) || !is_identifier(name) {
        return None;
    }
    Some(ObjectKey::new(namespace, name))
}

fn unexpected(token: &Token) -> NotationError {
    NotationError::syntax(token.text(), token.position, "unexpected token")
}

/// SCREAMING_CASE words are reserved for verbs and constants.
fn looks_like_verb(word: &str) -> bool {
    is_config_name(word)
}

pub(crate) fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lex `source` without its surrounding whitespace, keeping positions
/// relative to the untrimmed string.
fn lex_trimmed(source: &str) -> Result<Vec<Token>, NotationError> {
    let offset = source.chars().take_while(|c| c.is_whitespace()).count();
    match lex(source.trim()) {
        Ok(tokens) => Ok(tokens
            .into_iter()
            .map(|mut token| {
                token.position += offset;
                token
            })
            .collect()),
        Err(NotationError::Syntax {
            token,
            position,
            message,
        }) => Err(NotationError::Syntax {
            token,
            position: position + offset,
            message,
        }),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vocabulary;

    fn verb(source: &str) -> Verb {
        parse_directive(source).expect("parse").verb
    }

    fn count(source: &str) -> Option<CountSpec> {
        parse_directive(source).expect("parse").count
    }

    fn syntax(source: &str) -> (String, usize, String) {
        match parse_directive(source) {
            Err(NotationError::Syntax {
                token,
                position,
                message,
            }) => (token, position, message),
            other => panic!("expected syntax error for `{source}`, got {other:?}"),
        }
    }

    #[test]
    fn parses_choose_list_with_counts() {
        assert_eq!(
            verb("CHOOSE[[a, b ,c]]"),
            Verb::Choose {
                source: ChoiceSource::List(vec!["a".into(), "b".into(), "c".into()])
            }
        );
        assert_eq!(count("CHOOSE[[a,b,c]]"), None);
        assert_eq!(count("CHOOSE[[a,b,c]][2]"), Some(CountSpec::Literal(2)));
        assert_eq!(count("CHOOSE[[a,b,c]][n]"), Some(CountSpec::Random));
        assert_eq!(
            count("CHOOSE[[a,b,c]][[NB_TAGS]]"),
            Some(CountSpec::Config("NB_TAGS".into()))
        );
    }

    #[test]
    fn parses_choose_ranges_and_named_sources() {
        assert_eq!(
            verb("CHOOSE[[21-89]]"),
            Verb::Choose {
                source: ChoiceSource::Range { lo: 21, hi: 89 }
            }
        );
        assert_eq!(
            verb("CHOOSE[[user_id]][3]"),
            Verb::Choose {
                source: ChoiceSource::Named("user_id".into())
            }
        );
        assert_eq!(
            verb("CHOOSE[[San Francisco]]"),
            Verb::Choose {
                source: ChoiceSource::List(vec!["San Francisco".into()])
            }
        );
    }

    #[test]
    fn rejects_inverted_ranges() {
        let (token, position, message) = syntax("CHOOSE[[89-21]]");
        assert_eq!(token, "[[89-21]]");
        assert_eq!(position, 6);
        assert!(message.contains("inverted range"));
    }

    #[test]
    fn rejects_ranges_that_are_not_two_integers() {
        let (token, position, message) = syntax("CHOOSE[[99999999999999999999-1]]");
        assert_eq!(token, "[[99999999999999999999-1]]");
        assert_eq!(position, 6);
        assert!(message.contains("`99999999999999999999` does not fit"));

        let (token, _, message) = syntax("CHOOSE[[-5-5]]");
        assert_eq!(token, "[[-5-5]]");
        assert!(message.contains("malformed range"));
        assert!(syntax("CHOOSE[[1-2-3]]").2.contains("malformed range"));

        assert_eq!(
            verb("CHOOSE[[v-1]]"),
            Verb::Choose {
                source: ChoiceSource::List(vec!["v-1".into()])
            }
        );
    }

    #[test]
    fn parses_unique_tags() {
        assert_eq!(
            verb("UNIQUE[int]"),
            Verb::Unique {
                kind: UniqueKind::Int
            }
        );
        assert_eq!(
            verb("UNIQUE[str]"),
            Verb::Unique {
                kind: UniqueKind::Str
            }
        );
        assert!(syntax("UNIQUE[[int]]").2.contains("single brackets"));
        assert!(syntax("UNIQUE[uuid]").2.contains("unknown UNIQUE type tag"));
        assert!(syntax("UNIQUE").2.contains("requires a type tag"));
    }

    #[test]
    fn parses_references() {
        assert_eq!(verb("[[NB_USERS]]"), Verb::ConfigRef("NB_USERS".into()));
        assert_eq!(verb("[[user_id]]"), Verb::SharedRef("user_id".into()));
        assert_eq!(
            verb("[[object.core.user]]"),
            Verb::ObjectRef(ObjectKey::new("core", "user"))
        );
        assert_eq!(count("[[object.core.user]][n]"), Some(CountSpec::Random));
        assert!(
            syntax("[[user_id]][2]")
                .2
                .contains("only allowed on object references")
        );
        assert!(syntax("[[object.core]]").2.contains("object.<namespace>"));
    }

    #[test]
    fn parses_constants_and_raw_types() {
        assert_eq!(
            verb("PERMISSIONS[3]"),
            Verb::Constant {
                constant: ConstantRef {
                    vocabulary: Vocabulary::Permission,
                    plural: true
                }
            }
        );
        assert_eq!(count("PERMISSIONS[3]"), Some(CountSpec::Literal(3)));
        assert_eq!(
            verb("NAME"),
            Verb::Constant {
                constant: ConstantRef {
                    vocabulary: Vocabulary::Name,
                    plural: false
                }
            }
        );
        assert_eq!(verb("float"), Verb::Raw { ty: RawType::Float });
        assert_eq!(count("int[4]"), Some(CountSpec::Literal(4)));
    }

    #[test]
    fn parses_dates() {
        assert_eq!(
            verb("DATE"),
            Verb::Date {
                format: DEFAULT_DATE_FORMAT.into()
            }
        );
        assert_eq!(
            verb("DATE[%Y-%m-%dT%H:%M:%S]"),
            Verb::Date {
                format: "%Y-%m-%dT%H:%M:%S".into()
            }
        );
        assert_eq!(count("DATE[2]"), Some(CountSpec::Literal(2)));
        assert_eq!(count("DATE[%d/%m/%Y][n]"), Some(CountSpec::Random));
        assert!(syntax("DATE[%Q]").2.contains("invalid DATE format"));
    }

    #[test]
    fn bare_text_is_literal_but_unknown_verbs_fail() {
        assert_eq!(verb("healthy"), Verb::Literal("healthy".into()));
        assert_eq!(verb("2.0"), Verb::Literal("2.0".into()));
        assert_eq!(verb(""), Verb::Literal("".into()));

        let (token, position, message) = syntax("PERMISION[3]");
        assert_eq!((token.as_str(), position), ("PERMISION", 0));
        assert!(message.contains("unknown verb"));
        assert!(syntax("BOGUS").2.contains("unknown verb"));
        assert!(syntax("lower[2]").2.contains("unknown verb"));
    }

    #[test]
    fn rejects_bad_counts() {
        assert!(syntax("CHOOSE[[a,b]][two]").2.contains("integer or `n`"));
        assert!(syntax("CHOOSE[[a,b]][[2]]").2.contains("literal count"));
        assert!(syntax("CHOOSE[[a,b]][NB_TAGS]").2.contains("double brackets"));
        assert!(matches!(
            parse_directive("CHOOSE[[a,b]][0]"),
            Err(NotationError::InvalidCardinality { .. })
        ));
        assert!(matches!(
            parse_directive("JOBS[-2]"),
            Err(NotationError::InvalidCardinality { .. })
        ));
        assert!(syntax("CHOOSE[3]").2.contains("double brackets"));
        assert!(syntax("CHOOSE[[a,b]][2][3]").2.contains("unexpected token"));
    }

    #[test]
    fn positions_account_for_leading_whitespace() {
        let (_, position, _) = syntax("  CHOOSE[[a,b]");
        assert_eq!(position, 8);
    }

    #[test]
    fn parses_entry_keys() {
        assert_eq!(
            parse_entry_key("users[10]").expect("key"),
            EntryKey {
                name: "users".into(),
                rows: Some(CountSpec::Literal(10))
            }
        );
        assert_eq!(
            parse_entry_key("user_id[[NB_USERS]]").expect("key"),
            EntryKey {
                name: "user_id".into(),
                rows: Some(CountSpec::Config("NB_USERS".into()))
            }
        );
        assert_eq!(parse_entry_key("posts").expect("key").rows, None);

        let err = parse_entry_key("users[[10]]").expect_err("literal in double brackets");
        assert!(matches!(err, NotationError::Syntax { position: 5, .. }));
        assert!(parse_entry_key("users[n]").is_err());
        assert!(parse_entry_key("bad name[2]").is_err());
    }

    #[test]
    fn parses_object_keys_in_every_form() {
        let expected = ObjectKey::new("core", "user");
        assert_eq!(parse_object_key("core.user").expect("plain"), expected);
        assert_eq!(parse_object_key("object.core.user").expect("prefixed"), expected);
        assert_eq!(
            parse_object_key("[[object.core.user]]").expect("bracketed"),
            expected
        );
        assert!(parse_object_key("core").is_err());
        assert!(parse_object_key("[object.core.user]").is_err());
    }
}
