//! Line-oriented food log commands.
//!
//! ```text
//! ingredient butter --unit=cup --amt=1 --kcal=1628 --carbs=0.1 --fat=184 --protein=1.9
//! ingredient boxmac --unit=serving --amt=1 --kcal=250 --carbs=47 --fat=3 --protein=9
//! combine "cheesy mac" butter 0.25 boxmac 1.5   # --amt=1 --unit=serving by default
//! eat 1463977331 "cheesy mac" --amt=2
//! ```

use std::collections::BTreeMap;

use crate::error::{FoodError, FoodResult};
use crate::models::{Component, Nutrients};

pub const DEFAULT_COMBINE_UNIT: &str = "serving";

/// One parsed, validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Ingredient {
        name: String,
        unit: String,
        amount: f64,
        nutrients: Nutrients,
    },
    Combine {
        name: String,
        components: Vec<Component>,
        amount: f64,
        unit: String,
    },
    Eat {
        time: f64,
        item: String,
        amount: f64,
    },
}

/// Parse one line. Blank and comment-only lines yield `None`.
pub fn parse_line(line: &str) -> FoodResult<Option<Record>> {
    let words = tokenize(line)?;
    let Some((command, rest)) = words.split_first() else {
        return Ok(None);
    };
    let record = match command.as_str() {
        "ingredient" => parse_ingredient(rest)?,
        "combine" => parse_combine(rest)?,
        "eat" => parse_eat(rest)?,
        other => return Err(malformed(format!("unknown command '{other}'"))),
    };
    Ok(Some(record))
}

/// Split a line into words, honoring quotes, backslash escapes and `#`
/// comments.
pub fn tokenize(line: &str) -> FoodResult<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '#' => break,
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(q) => current.push(q),
                        None => return Err(malformed("unterminated single quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e @ ('"' | '\\')) => current.push(e),
                            Some(e) => {
                                current.push('\\');
                                current.push(e);
                            }
                            None => return Err(malformed("unterminated double quote")),
                        },
                        Some(q) => current.push(q),
                        None => return Err(malformed("unterminated double quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(e) => current.push(e),
                    None => return Err(malformed("trailing backslash")),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn parse_ingredient(args: &[String]) -> FoodResult<Record> {
    let mut parsed = Args::parse(
        args,
        &[
            ("unit", 'u'),
            ("amt", 'a'),
            ("kcal", 'C'),
            ("carbs", 'c'),
            ("fat", 'f'),
            ("protein", 'p'),
        ],
    )?;
    let [name] = parsed.take_positional::<1>("ingredient <name>")?;
    let unit = parsed.required("unit")?;
    let amount = number("amt", &parsed.required("amt")?)?;
    let nutrients = Nutrients::new(
        number("kcal", &parsed.required("kcal")?)?,
        number("carbs", &parsed.required("carbs")?)?,
        number("fat", &parsed.required("fat")?)?,
        number("protein", &parsed.required("protein")?)?,
    );
    Ok(Record::Ingredient {
        name,
        unit,
        amount,
        nutrients,
    })
}

fn parse_combine(args: &[String]) -> FoodResult<Record> {
    let mut parsed = Args::parse(args, &[("amt", 'a'), ("unit", 'u')])?;
    let amount = parsed
        .optional("amt")
        .map(|a| number("amt", &a))
        .transpose()?
        .unwrap_or(1.0);
    let unit = parsed
        .optional("unit")
        .unwrap_or_else(|| DEFAULT_COMBINE_UNIT.to_string());

    let mut positional = std::mem::take(&mut parsed.positional).into_iter();
    let name = positional
        .next()
        .ok_or_else(|| malformed("usage: combine <name> <ingredient> <amount> ..."))?;
    let rest: Vec<String> = positional.collect();
    if rest.is_empty() {
        return Err(malformed(format!(
            "'{name}' needs at least one ingredient/amount pair"
        )));
    }
    if rest.len() % 2 != 0 {
        return Err(malformed(format!(
            "'{name}' has an ingredient without an amount"
        )));
    }
    let components = rest
        .chunks(2)
        .map(|pair| Ok(Component::new(pair[0].clone(), number(&pair[0], &pair[1])?)))
        .collect::<FoodResult<Vec<_>>>()?;

    Ok(Record::Combine {
        name,
        components,
        amount,
        unit,
    })
}

fn parse_eat(args: &[String]) -> FoodResult<Record> {
    let mut parsed = Args::parse(args, &[("amt", 'a')])?;
    let [time, item] = parsed.take_positional::<2>("eat <time> <item>")?;
    let time = number("time", &time)?;
    let amount = parsed
        .optional("amt")
        .map(|a| number("amt", &a))
        .transpose()?
        .unwrap_or(1.0);
    Ok(Record::Eat { time, item, amount })
}

/// Positional words plus `--flag=value` options.
struct Args {
    positional: Vec<String>,
    flags: BTreeMap<&'static str, String>,
}

impl Args {
    fn parse(words: &[String], known: &[(&'static str, char)]) -> FoodResult<Self> {
        let mut positional = Vec::new();
        let mut flags = BTreeMap::new();
        let mut iter = words.iter();

        while let Some(word) = iter.next() {
            if !word.starts_with('-') || word == "-" || word.parse::<f64>().is_ok() {
                positional.push(word.clone());
                continue;
            }
            let (key, inline) = match word.strip_prefix("--") {
                Some(long) => match long.split_once('=') {
                    Some((k, v)) => (k.to_string(), Some(v.to_string())),
                    None => (long.to_string(), None),
                },
                None => {
                    let short = &word[1..];
                    let mut cs = short.chars();
                    let first = cs.next().unwrap_or('-');
                    let tail: String = cs.collect();
                    let tail = tail.strip_prefix('=').map_or(tail.clone(), str::to_string);
                    let long = known
                        .iter()
                        .find(|(_, s)| *s == first)
                        .map_or_else(|| short.to_string(), |(l, _)| (*l).to_string());
                    (long, (!tail.is_empty()).then_some(tail))
                }
            };
            let Some(&(name, _)) = known.iter().find(|(l, _)| *l == key) else {
                return Err(malformed(format!("unrecognized option '{word}'")));
            };
            let value = match inline {
                Some(v) => v,
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| malformed(format!("option --{name} expects a value")))?,
            };
            if flags.insert(name, value).is_some() {
                return Err(malformed(format!("option --{name} given twice")));
            }
        }

        Ok(Self { positional, flags })
    }

    fn take_positional<const N: usize>(&mut self, usage: &str) -> FoodResult<[String; N]> {
        std::mem::take(&mut self.positional)
            .try_into()
            .map_err(|got: Vec<String>| {
                malformed(format!(
                    "expected {N} argument(s) ({usage}), got {}",
                    got.len()
                ))
            })
    }

    fn required(&mut self, name: &str) -> FoodResult<String> {
        self.flags
            .remove(name)
            .ok_or_else(|| malformed(format!("missing required option --{name}")))
    }

    fn optional(&mut self, name: &str) -> Option<String> {
        self.flags.remove(name)
    }
}

fn number(field: &str, raw: &str) -> FoodResult<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(malformed(format!("{field}: '{raw}' is not a number"))),
    }
}

fn malformed(msg: impl Into<String>) -> FoodError {
    FoodError::MalformedRecord(msg.into())
}
