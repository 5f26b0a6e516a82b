//! Deferred values rendered as CloudFormation intrinsic functions.
//!
//! Resources never hold each other directly. They hold [`Token`]s naming the
//! logical id they depend on, and synthesis checks every such name resolves
//! within the stack.

use std::collections::BTreeSet;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Pseudo parameters supplied by CloudFormation at deploy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    Region,
    AccountId,
    Partition,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(self) -> &'static str {
        match self {
            Pseudo::Region => "AWS::Region",
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// A string-valued property that may only be known at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(String),
    /// `{"Ref": id}` against a resource or parameter.
    Ref(String),
    /// `{"Fn::GetAtt": [id, attribute]}`.
    GetAtt(String, String),
    Pseudo(Pseudo),
    /// `{"Fn::Join": ["", parts]}`.
    Join(Vec<Token>),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Token::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Token::GetAtt(logical_id.into(), attribute.into())
    }

    /// Concatenate parts, folding adjacent literals and flattening nested joins.
    pub fn join<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        let mut folded: Vec<Token> = Vec::new();
        for part in parts {
            let pieces = match part {
                Token::Join(inner) => inner,
                other => vec![other],
            };
            for piece in pieces {
                if let Token::Literal(s) = &piece {
                    if s.is_empty() {
                        continue;
                    }
                    if let Some(Token::Literal(prev)) = folded.last_mut() {
                        prev.push_str(s);
                        continue;
                    }
                }
                folded.push(piece);
            }
        }

        match folded.len() {
            0 => Token::Literal(String::new()),
            1 => folded.remove(0),
            _ => Token::Join(folded),
        }
    }

    /// Logical ids this token depends on. Pseudo parameters are excluded.
    pub fn references(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Token::Ref(id) | Token::GetAtt(id, _) => {
                out.insert(id.as_str());
            }
            Token::Join(parts) => parts.iter().for_each(|p| p.collect_references(out)),
            Token::Literal(_) | Token::Pseudo(_) => {}
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl From<Pseudo> for Token {
    fn from(value: Pseudo) -> Self {
        Token::Pseudo(value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(s) => f.write_str(s),
            Token::Ref(id) => write!(f, "${{Token[{id}.Ref]}}"),
            Token::GetAtt(id, attr) => write!(f, "${{Token[{id}.{attr}]}}"),
            Token::Pseudo(p) => write!(f, "${{{}}}", p.as_str()),
            Token::Join(parts) => parts.iter().try_for_each(|p| p.fmt(f)),
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Token::Literal(s) => serializer.serialize_str(s),
            Token::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Token::Pseudo(p) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", p.as_str())?;
                map.end()
            }
            Token::GetAtt(id, attr) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[id, attr])?;
                map.end()
            }
            Token::Join(parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &JoinArgs(parts))?;
                map.end()
            }
        }
    }
}

struct JoinArgs<'a>(&'a [Token]);

impl Serialize for JoinArgs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element("")?;
        seq.serialize_element(self.0)?;
        seq.end()
    }
}

/// Walk rendered JSON and collect every `Ref`/`Fn::GetAtt` target that is not
/// a pseudo parameter.
pub fn collect_json_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !target.starts_with("AWS::") {
                        out.insert(target.clone());
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = args.first() {
                        out.insert(target.clone());
                    }
                    return;
                }
            }
            map.values().for_each(|v| collect_json_references(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_json_references(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn join_folds_adjacent_literals() {
        let token = Token::join([
            Token::literal("arn:"),
            Token::Pseudo(Pseudo::Partition),
            Token::literal(":iam::"),
            Token::literal("aws:policy/"),
            Token::literal("x"),
        ]);
        assert_eq!(
            token,
            Token::Join(vec![
                Token::literal("arn:"),
                Token::Pseudo(Pseudo::Partition),
                Token::literal(":iam::aws:policy/x"),
            ])
        );
    }

    #[test]
    fn join_of_literals_collapses_to_literal() {
        let token = Token::join([Token::literal("a"), Token::literal(""), Token::literal("b")]);
        assert_eq!(token, Token::literal("ab"));
    }

    #[test]
    fn serializes_to_intrinsics() {
        let token = Token::join([
            Token::literal("https://"),
            Token::reference("Api"),
            Token::literal("."),
            Token::get_att("Fn", "Arn"),
            Token::Pseudo(Pseudo::Region),
        ]);
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(
            value,
            json!({"Fn::Join": ["", [
                "https://",
                {"Ref": "Api"},
                ".",
                {"Fn::GetAtt": ["Fn", "Arn"]},
                {"Ref": "AWS::Region"}
            ]]})
        );
    }

    #[test]
    fn references_skip_pseudo_parameters() {
        let token = Token::join([
            Token::Pseudo(Pseudo::AccountId),
            Token::reference("Table"),
            Token::get_att("Role", "Arn"),
        ]);
        let refs: Vec<_> = token.references().into_iter().collect();
        assert_eq!(refs, vec!["Role", "Table"]);

        let mut from_json = BTreeSet::new();
        collect_json_references(&serde_json::to_value(&token).unwrap(), &mut from_json);
        assert_eq!(
            from_json.into_iter().collect::<Vec<_>>(),
            vec!["Role".to_string(), "Table".to_string()]
        );
    }
}
