//! Label format strings
//!
//! A format string is literal text with `${expression}` holes. Expressions are deliberately small:
//!
//! ```text
//! expression  := concat ( '?' expression ':' expression )?
//! concat      := primary ( '+' primary )*
//! primary     := string | integer | path | '(' expression ')'
//! string      := '\'' [^']* '\'' | '"' [^"]* '"'
//! path        := identifier ( '.' identifier )*
//! ```
//!
//! The only names in scope are `version`, `study` and `node`. Reading a field of a missing value,
//! printing a missing value, or naming anything else is an evaluation error.

use crate::{
    error::{ProvenanceError, Result},
    properties::{ProvenanceNode, Study},
};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, not, opt, recognize},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Text(String),
    Integer(i64),
    Path(Vec<String>),
    Concat(Vec<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Hole(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Everything a format string can see.
#[derive(Debug, Clone, Copy)]
pub struct LabelContext<'a> {
    pub version: u32,
    pub study: Option<&'a Study>,
    pub node: &'a ProvenanceNode,
}

#[derive(Debug, Clone, PartialEq)]
enum Value<'a> {
    Str(String),
    Int(i64),
    Missing,
    Node(&'a ProvenanceNode),
    Study(&'a Study),
}

impl Value<'_> {
    fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Missing => false,
            Value::Node(_) | Value::Study(_) => true,
        }
    }

    fn into_text(self) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s),
            Value::Int(i) => Ok(i.to_string()),
            Value::Missing => Err(ProvenanceError::Template(
                "missing value cannot be printed".to_string(),
            )),
            Value::Node(node) => Err(ProvenanceError::Template(format!(
                "node {} cannot be printed, select one of its fields",
                node.id
            ))),
            Value::Study(study) => Err(ProvenanceError::Template(format!(
                "study {} cannot be printed, select one of its fields",
                study.id
            ))),
        }
    }
}

fn optional(value: &Option<String>) -> Value<'static> {
    value.clone().map(Value::Str).unwrap_or(Value::Missing)
}

fn field<'a>(value: Value<'a>, name: &str) -> Result<Value<'a>> {
    match (value, name) {
        (Value::Node(node), "id") => Ok(Value::Str(node.id.clone())),
        (Value::Node(node), "definitionId") => Ok(Value::Str(node.definition_id.clone())),
        (Value::Node(node), "studyId") => Ok(optional(&node.study_id)),
        (Value::Node(node), "label") => Ok(optional(&node.label)),
        (Value::Node(node), "facet") => Ok(optional(&node.facet)),
        (Value::Node(node), "relatedTo") => Ok(optional(&node.related_to)),
        (Value::Study(study), "id") => Ok(Value::Str(study.id.clone())),
        (Value::Study(study), "label") => Ok(optional(&study.label)),
        (Value::Study(study), "source") => Ok(optional(&study.source)),
        (Value::Missing, name) => Err(ProvenanceError::Template(format!(
            "cannot read '{name}' of a missing value"
        ))),
        (_, name) => Err(ProvenanceError::Template(format!("no field named '{name}'"))),
    }
}

impl Expr {
    fn eval<'a>(&self, ctx: &LabelContext<'a>) -> Result<Value<'a>> {
        match self {
            Expr::Text(text) => Ok(Value::Str(text.clone())),
            Expr::Integer(i) => Ok(Value::Int(*i)),
            Expr::Path(path) => {
                let mut parts = path.iter();
                let mut value = match parts.next().map(String::as_str) {
                    Some("version") => Value::Int(i64::from(ctx.version)),
                    Some("study") => ctx.study.map(Value::Study).unwrap_or(Value::Missing),
                    Some("node") => Value::Node(ctx.node),
                    Some(other) => {
                        return Err(ProvenanceError::Template(format!(
                            "'{other}' is not defined"
                        )))
                    }
                    None => return Err(ProvenanceError::Template("empty path".to_string())),
                };
                for name in parts {
                    value = field(value, name)?;
                }
                Ok(value)
            }
            Expr::Concat(parts) => {
                let mut acc: Option<Value<'a>> = None;
                for part in parts {
                    let rhs = part.eval(ctx)?;
                    acc = Some(match (acc, rhs) {
                        (None, rhs) => rhs,
                        (Some(Value::Int(l)), Value::Int(r)) => {
                            Value::Int(l.checked_add(r).ok_or_else(|| {
                                ProvenanceError::Template("integer overflow".to_string())
                            })?)
                        }
                        (Some(lhs), rhs) => Value::Str(lhs.into_text()? + &rhs.into_text()?),
                    });
                }
                acc.ok_or_else(|| ProvenanceError::Template("empty concatenation".to_string()))
            }
            Expr::Conditional(cond, then, otherwise) => {
                if cond.eval(ctx)?.truthy() {
                    then.eval(ctx)
                } else {
                    otherwise.eval(ctx)
                }
            }
        }
    }
}

impl Template {
    pub fn parse(source: &str) -> Result<Template> {
        let (_, segments) = all_consuming(many0(alt((hole, literal))))(source).map_err(|e| {
            ProvenanceError::Template(format!("could not parse '{source}': {e}"))
        })?;
        Ok(Template {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn render(&self, ctx: &LabelContext<'_>) -> Result<String> {
        let mut out = String::new();
        for segment in self.segments.iter() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Hole(expr) => out.push_str(&expr.eval(ctx)?.into_text()?),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Literal text up to the next `${`. A `$` not followed by `{` is literal.
fn literal(input: &str) -> IResult<&str, Segment> {
    map(
        recognize(many1(alt((
            is_not("$"),
            terminated(tag("$"), not(char('{'))),
        )))),
        |text: &str| Segment::Literal(text.to_string()),
    )(input)
}

fn hole(input: &str) -> IResult<&str, Segment> {
    map(delimited(tag("${"), expression, char('}')), Segment::Hole)(input)
}

fn expression(input: &str) -> IResult<&str, Expr> {
    let (input, cond) = concat(input)?;
    let (input, branches) = opt(pair(
        preceded(ws(char('?')), expression),
        preceded(ws(char(':')), expression),
    ))(input)?;
    let expr = match branches {
        Some((then, otherwise)) => {
            Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise))
        }
        None => cond,
    };
    Ok((input, expr))
}

fn concat(input: &str) -> IResult<&str, Expr> {
    let (input, first) = primary(input)?;
    let (input, rest) = many0(preceded(ws(char('+')), primary))(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    let mut parts = Vec::with_capacity(rest.len() + 1);
    parts.push(first);
    parts.extend(rest);
    Ok((input, Expr::Concat(parts)))
}

fn primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        string_literal,
        integer,
        path,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))(input)
}

fn string_literal(input: &str) -> IResult<&str, Expr> {
    map(
        alt((
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        )),
        |text: &str| Expr::Text(text.to_string()),
    )(input)
}

fn integer(input: &str) -> IResult<&str, Expr> {
    map_res(digit1, |digits: &str| digits.parse::<i64>().map(Expr::Integer))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn path(input: &str) -> IResult<&str, Expr> {
    map(
        pair(identifier, many0(preceded(char('.'), identifier))),
        |(head, tail)| {
            let mut parts = vec![head.to_string()];
            parts.extend(tail.into_iter().map(String::from));
            Expr::Path(parts)
        },
    )(input)
}
