//! Risk payload schema and the two rendering variants for the score.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Payload returned by the scoring service. Unknown fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RiskResult {
    pub readmission_30d: f64,
}

impl RiskResult {
    /// Parse and validate a response body. Anything that is not a JSON
    /// object with a finite numeric `readmission_30d` is a malformed
    /// response.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let result: RiskResult = serde_json::from_slice(body)?;
        if !result.readmission_30d.is_finite() {
            return Err(ClientError::MalformedResponse {
                message: format!(
                    "readmission_30d is not a finite number: {}",
                    result.readmission_30d
                ),
            });
        }
        Ok(result)
    }
}

/// How the score is written into the result element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// Shortest round-trip decimal, e.g. `0.4231`.
    #[default]
    Raw,
    /// Fixed-point with locale separators, e.g. `0,42`.
    Locale,
}

impl std::str::FromStr for NumberFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(NumberFormat::Raw),
            "locale" => Ok(NumberFormat::Locale),
            other => Err(ClientError::Config {
                message: format!("unknown number format '{}' (expected raw or locale)", other),
            }),
        }
    }
}

/// Separators and precision for [`NumberFormat::Locale`]. Defaults follow
/// pt-BR: comma decimals, dot grouping, two fraction digits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocaleStyle {
    pub decimal_separator: char,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_separator: Option<char>,
    pub fraction_digits: usize,
}

impl Default for LocaleStyle {
    fn default() -> Self {
        Self {
            decimal_separator: ',',
            group_separator: Some('.'),
            fraction_digits: 2,
        }
    }
}

/// Renders a score according to the configured variant.
#[derive(Debug, Clone, Default)]
pub struct RiskFormatter {
    format: NumberFormat,
    style: LocaleStyle,
}

impl RiskFormatter {
    pub fn new(format: NumberFormat, style: LocaleStyle) -> Self {
        Self { format, style }
    }

    pub fn format(&self) -> NumberFormat {
        self.format
    }

    pub fn render(&self, value: f64) -> String {
        match self.format {
            NumberFormat::Raw => value.to_string(),
            NumberFormat::Locale => self.render_locale(value),
        }
    }

    fn render_locale(&self, value: f64) -> String {
        let (int_part, frac_part) = round_half_expand(value.abs(), self.style.fraction_digits);

        let mut out = String::with_capacity(int_part.len() + frac_part.len() + 4);
        // A value that rounds to zero keeps its sign, as toLocaleString does.
        if value.is_sign_negative() && value != 0.0 {
            out.push('-');
        }
        match self.style.group_separator {
            Some(sep) => {
                let len = int_part.len();
                for (idx, ch) in int_part.chars().enumerate() {
                    if idx > 0 && (len - idx) % 3 == 0 {
                        out.push(sep);
                    }
                    out.push(ch);
                }
            }
            None => out.push_str(&int_part),
        }
        if !frac_part.is_empty() {
            out.push(self.style.decimal_separator);
            out.push_str(&frac_part);
        }
        out
    }
}

/// Round a non-negative value to `digits` fraction digits, ties away from
/// zero, working on its shortest round-trip decimal form (what `Intl`
/// number formatting rounds). Returns the integer and fraction digits.
fn round_half_expand(value: f64, digits: usize) -> (String, String) {
    let shortest = value.to_string();
    let (int_part, frac_part) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));

    let round_up = frac_part.as_bytes().get(digits).is_some_and(|d| *d >= b'5');
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .collect();
    kept.resize(int_part.len() + digits, b'0');

    let mut int_len = int_part.len();
    if round_up {
        let mut carry = true;
        for d in kept.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, b'1');
            int_len += 1;
        }
    }

    let frac = kept.split_off(int_len);
    (
        String::from_utf8_lossy(&kept).into_owned(),
        String::from_utf8_lossy(&frac).into_owned(),
    )
}
