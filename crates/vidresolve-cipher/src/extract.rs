//! Transform program extraction from player code.
//!
//! The decipher function has a stable outer shape:
//!
//! ```text
//! NAME=function(a){a=a.split("");HELPER.op(a,N);...;return a.join("")}
//! ```
//!
//! Each statement either calls a method on a helper object literal or
//! performs one of the operations inline. Helper methods are classified by
//! their bodies, since their names are minified and change between releases.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::program::{Op, TransformProgram};

static DECIPHER_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:function\s+[\w$]+|[\w$]+\s*=\s*function)\s*\(\s*([\w$]+)\s*\)\s*\{\s*([\w$]+)\s*=\s*([\w$]+)\.split\(\s*""\s*\)\s*;([^{}]*?)return\s+([\w$]+)\.join\(\s*""\s*\)"#,
    )
    .unwrap()
});

static HELPER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^([\w$]+)\s*(?:\.\s*([\w$]+)|\[\s*["']([\w$]+)["']\s*\])\s*\(\s*([\w$]+)\s*(?:,\s*(\d+)\s*)?\)$"#,
    )
    .unwrap()
});

static INLINE_REVERSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w$]+)\.reverse\(\s*\)$").unwrap());

static INLINE_SPLICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w$]+)\.splice\(\s*0\s*,\s*(\d+)\s*\)$").unwrap());

static INLINE_SLICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w$]+)\s*=\s*([\w$]+)\.slice\(\s*(\d+)\s*\)$").unwrap());

static HELPER_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:["']([\w$]+)["']|([\w$]+))\s*:\s*function\s*\([^)]*\)\s*\{([^{}]*)\}"#,
    )
    .unwrap()
});

/// Operation kinds a helper method can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Reverse,
    SwapHead,
    DropPrefix,
}

impl OpKind {
    fn classify(body: &str) -> Option<Self> {
        if body.contains(".reverse(") {
            Some(Self::Reverse)
        } else if body.contains("[0]") && body.contains('%') && body.contains(".length") {
            // Checked first: some swap bodies use splice to place the head.
            Some(Self::SwapHead)
        } else if body.contains(".splice(") || body.contains(".slice(") {
            Some(Self::DropPrefix)
        } else {
            None
        }
    }

    fn with_arg(self, arg: Option<usize>, statement: &str) -> Result<Op> {
        match self {
            Self::Reverse => Ok(Op::Reverse),
            Self::SwapHead => arg
                .map(Op::SwapHead)
                .ok_or_else(|| Error::MissingArgument(statement.to_string())),
            Self::DropPrefix => arg
                .map(Op::DropPrefix)
                .ok_or_else(|| Error::MissingArgument(statement.to_string())),
        }
    }
}

/// Extract the transform program from a player code blob.
///
/// Fails when the decipher function cannot be located, when it references a
/// helper that is not defined, or when any statement has an unrecognized
/// shape. Silently skipping unknown statements would produce wrong URLs.
pub fn extract_transform_program(code: &str) -> Result<TransformProgram> {
    let (param, body) = find_decipher_body(code).ok_or(Error::PatternNotFound)?;
    trace!(param, body, "located decipher function");

    let mut helpers: HashMap<String, HashMap<String, Option<OpKind>>> = HashMap::new();
    let mut ops = Vec::new();

    for statement in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let op = parse_statement(code, param, statement, &mut helpers)?;
        ops.push(op);
    }

    if ops.is_empty() {
        return Err(Error::EmptyProgram);
    }

    let program = TransformProgram::new(ops);
    debug!(ops = program.len(), program = %program, "extracted transform program");
    Ok(program)
}

/// Find the decipher function, returning its parameter name and the
/// statements between the split and the join.
fn find_decipher_body(code: &str) -> Option<(&str, &str)> {
    DECIPHER_FN.captures_iter(code).find_map(|caps| {
        let param = caps.get(1)?.as_str();
        let names_agree = [2, 3, 5]
            .iter()
            .all(|&i| caps.get(i).map(|m| m.as_str()) == Some(param));
        if names_agree {
            Some((param, caps.get(4)?.as_str()))
        } else {
            None
        }
    })
}

fn parse_statement(
    code: &str,
    param: &str,
    statement: &str,
    helpers: &mut HashMap<String, HashMap<String, Option<OpKind>>>,
) -> Result<Op> {
    if let Some(caps) = INLINE_REVERSE.captures(statement) {
        if &caps[1] == param {
            return Ok(Op::Reverse);
        }
    }
    if let Some(caps) = INLINE_SPLICE.captures(statement) {
        if &caps[1] == param {
            return Ok(Op::DropPrefix(parse_arg(&caps[2], statement)?));
        }
    }
    if let Some(caps) = INLINE_SLICE.captures(statement) {
        if &caps[1] == param && &caps[2] == param {
            return Ok(Op::DropPrefix(parse_arg(&caps[3], statement)?));
        }
    }

    let caps = HELPER_CALL
        .captures(statement)
        .ok_or_else(|| Error::unknown_operation(statement))?;
    if &caps[4] != param {
        return Err(Error::unknown_operation(statement));
    }

    let object = &caps[1];
    let method = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::unknown_operation(statement))?;
    let arg = caps
        .get(5)
        .map(|m| parse_arg(m.as_str(), statement))
        .transpose()?;

    if !helpers.contains_key(object) {
        let methods = parse_helper_object(code, object)?;
        helpers.insert(object.to_string(), methods);
    }

    let kind = helpers
        .get(object)
        .and_then(|methods| methods.get(method))
        .copied()
        .flatten()
        .ok_or_else(|| Error::unknown_operation(statement))?;

    kind.with_arg(arg, statement)
}

fn parse_arg(digits: &str, statement: &str) -> Result<usize> {
    digits
        .parse()
        .map_err(|_| Error::MissingArgument(statement.to_string()))
}

/// Locate `OBJECT={...}` and classify each of its methods.
fn parse_helper_object(code: &str, object: &str) -> Result<HashMap<String, Option<OpKind>>> {
    let pattern = format!(
        r"(?:^|[^\w$.])(?:var\s+|let\s+|const\s+)?{}\s*=\s*\{{",
        regex::escape(object)
    );
    let re = Regex::new(&pattern).map_err(|_| Error::HelperNotFound(object.to_string()))?;

    let open = re
        .find(code)
        .map(|m| m.end() - 1)
        .ok_or_else(|| Error::HelperNotFound(object.to_string()))?;
    let close =
        matching_brace(code, open).ok_or_else(|| Error::HelperNotFound(object.to_string()))?;
    let literal = &code[open + 1..close];

    let methods: HashMap<String, Option<OpKind>> = HELPER_METHOD
        .captures_iter(literal)
        .filter_map(|caps| {
            let name = caps.get(1).or_else(|| caps.get(2))?.as_str().to_string();
            Some((name, OpKind::classify(&caps[3])))
        })
        .collect();

    trace!(object, methods = methods.len(), "parsed helper object");
    Ok(methods)
}

/// Find the brace closing the one at `open`, skipping quoted strings.
fn matching_brace(code: &str, open: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
