use crate::error::{DocError, Result};
use crate::fields::projection::{Assignment, Pipeline, Projection, Selector};
use crate::path::SEPARATOR;

const RENAME: &str = "__as__";
const ASSIGN: &str = ":=";
const PLUCK: &str = "..";

/// A single parsed token, before it is folded into a [`Projection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `*`
    Star,
    /// `__as__name`
    Envelope(String),
    /// `-path`
    Exclude(String),
    /// `key:=literal[:pipeline]`
    Assign { path: String, assignment: Assignment },
    /// `path[__as__new][:pipeline]`
    Include {
        path: String,
        rename: Option<String>,
        pipeline: Pipeline,
    },
}

/// Parse one trimmed token.
pub fn parse_token(token: &str) -> Result<Directive> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DocError::spec(token, "empty token"));
    }
    if token == "*" {
        return Ok(Directive::Star);
    }

    if let Some((key, rest)) = token.split_once(ASSIGN) {
        let key = key.trim();
        if key.is_empty() {
            return Err(DocError::spec(token, "assignment without a key"));
        }
        if key.starts_with('-') || key.contains('*') {
            return Err(DocError::spec(token, "assignments need a plain target key"));
        }
        let (literal, pipeline) = match rest.split_once(':') {
            Some((literal, pipeline)) => (literal, Pipeline::parse(pipeline, token)?),
            None => (rest, Pipeline::default()),
        };
        return Ok(Directive::Assign {
            path: key.to_string(),
            assignment: Assignment {
                literal: literal.to_string(),
                pipeline,
            },
        });
    }

    let (head, pipeline) = match token.split_once(':') {
        Some((head, pipeline)) => (head.trim(), Pipeline::parse(pipeline, token)?),
        None => (token, Pipeline::default()),
    };
    let (path, exclude) = match head.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (head, false),
    };

    let (path, rename) = match path.split_once(RENAME) {
        Some(("", target)) => {
            if target.is_empty() {
                return Err(DocError::spec(token, "envelope needs a name"));
            }
            if exclude || !pipeline.is_empty() {
                return Err(DocError::spec(token, "envelope takes no other directives"));
            }
            return Ok(Directive::Envelope(target.to_string()));
        }
        Some((root, "")) => (root, Some(last_segment(root).to_string())),
        Some((root, target)) => (root, Some(target.to_string())),
        None => (path, None),
    };

    if path.is_empty() {
        return Err(DocError::spec(token, "empty path"));
    }
    if exclude {
        if rename.is_some() || !pipeline.is_empty() {
            return Err(DocError::spec(token, "excluded keys take no rename or transforms"));
        }
        return Ok(Directive::Exclude(path.to_string()));
    }
    if let Some(pos) = path.find('*') {
        if pos + 1 != path.len() {
            return Err(DocError::spec(token, "`*` is only allowed at the end of a path"));
        }
        if rename.is_some() {
            return Err(DocError::spec(token, "wildcards can not be renamed"));
        }
    }

    Ok(Directive::Include {
        path: path.to_string(),
        rename,
        pipeline,
    })
}

fn last_segment(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

/// Fold a token list into a [`Projection`].
pub fn compile_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Projection> {
    let mut projection = Projection::default();
    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        projection.fields.push(token.to_string());
        match parse_token(token)? {
            Directive::Star => projection.star = true,
            Directive::Envelope(name) => projection.envelope = Some(name),
            Directive::Exclude(path) => projection.exclude.push(path),
            Directive::Assign { path, assignment } => {
                let root = match path.split_once(PLUCK) {
                    Some((list, _)) => list.to_string(),
                    None => path.clone(),
                };
                projection.include_selector(Selector::Exact(root));
                projection.assignments.push((path, assignment));
            }
            Directive::Include {
                path,
                rename,
                pipeline,
            } => fold_include(&mut projection, token, path, rename, pipeline)?,
        }
    }
    Ok(projection)
}

fn fold_include(
    projection: &mut Projection,
    token: &str,
    path: String,
    rename: Option<String>,
    pipeline: Pipeline,
) -> Result<()> {
    let (flatten, unflat, pipeline) = pipeline.split_structural();

    let output = if let Some(prefix) = path.strip_suffix('*') {
        if !pipeline.is_empty() || flatten.is_some() || unflat {
            return Err(DocError::spec(token, "wildcards take no transforms"));
        }
        projection.include_selector(Selector::Prefix(prefix.to_string()));
        return Ok(());
    } else if let Some((list, field)) = path.split_once(PLUCK) {
        if list.is_empty() || field.is_empty() {
            return Err(DocError::spec(token, "expected `list..field`"));
        }
        let target = rename.unwrap_or_else(|| format!("{list}{SEPARATOR}{field}"));
        projection.include_selector(Selector::Pluck {
            list: list.to_string(),
            field: field.to_string(),
            target: target.clone(),
        });
        target
    } else if unflat && rename.is_none() {
        projection.include_selector(Selector::Flat(path.clone()));
        path.clone()
    } else {
        projection.include_selector(Selector::Exact(path.clone()));
        match rename {
            Some(target) => {
                projection
                    .renames
                    .entry(path.clone())
                    .or_default()
                    .push(target.clone());
                projection.renames_rev.insert(target.clone(), path.clone());
                target
            }
            None => {
                projection.explicit.insert(path.clone());
                path.clone()
            }
        }
    };

    if let Some(mode) = flatten {
        projection.flattens.insert(path, mode);
    }
    if unflat && !projection.unflattens.contains(&output) {
        projection.unflattens.push(output.clone());
    }
    if !pipeline.is_empty() {
        projection
            .transforms
            .entry(output)
            .or_default()
            .extend(pipeline);
    }
    Ok(())
}
