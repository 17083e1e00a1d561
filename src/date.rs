use std::fmt::Display;
use std::ops::Range;
use std::str::FromStr;

use crate::error::PDFError;

/// Direction of the offset from universal time in a date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtOffset {
    Ahead,
    Behind,
    Utc,
}

/// A date value stored in a PDF document.
///
/// The string form is `D:YYYYMMDDHHmmSSOHH'mm` where `O` is `+`, `-` or
/// `Z`. All fields after the year are optional; a month or day defaults to
/// 1, the time fields and the offset default to 0 and UTC. A trailing
/// apostrophe, as written by pre-2.0 producers, is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PDFDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub offset: UtOffset,
    pub offset_hour: u8,
    pub offset_minute: u8,
}

impl PDFDate {
    /// A date at midnight UTC on the first day of the given year.
    pub fn from_year(year: i32) -> Self {
        PDFDate {
            year,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            offset: UtOffset::Utc,
            offset_hour: 0,
            offset_minute: 0,
        }
    }

    /// The canonical string form, suitable for an Info dictionary entry.
    pub fn to_pdf_string(&self) -> String {
        let mut out = format!(
            "D:{:04}{:02}{:02}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        match self.offset {
            UtOffset::Utc => out.push('Z'),
            UtOffset::Ahead => {
                out.push_str(&format!("+{:02}'{:02}", self.offset_hour, self.offset_minute))
            }
            UtOffset::Behind => {
                out.push_str(&format!("-{:02}'{:02}", self.offset_hour, self.offset_minute))
            }
        }
        out
    }
}

impl Display for PDFDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_pdf_string())
    }
}

fn digits(text: &str, range: Range<usize>) -> Option<u32> {
    let part = text.get(range)?;
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl FromStr for PDFDate {
    type Err = PDFError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bad = || PDFError::parse(format!("invalid date string: '{text}'"));

        // Pre-2.0 dates may end with an apostrophe.
        let text = text.strip_suffix('\'').unwrap_or(text);

        if !text.starts_with("D:") || text.len() < 6 {
            return Err(bad());
        }

        let year = digits(text, 2..6).ok_or_else(bad)? as i32;
        let mut date = PDFDate::from_year(year);

        // Month through second are two-digit fields that may stop at any
        // point; the offset, when present, starts where the digits end.
        let mut pos = 6;
        {
            let fields: [&mut u8; 5] = [
                &mut date.month,
                &mut date.day,
                &mut date.hour,
                &mut date.minute,
                &mut date.second,
            ];
            for field in fields {
                match digits(text, pos..pos + 2) {
                    Some(value) => {
                        *field = value as u8;
                        pos += 2;
                    }
                    None => break,
                }
            }
        }

        if pos < text.len() {
            match &text[pos..pos + 1] {
                "Z" => pos += 1,
                sign @ ("+" | "-") => {
                    date.offset = if sign == "+" {
                        UtOffset::Ahead
                    } else {
                        UtOffset::Behind
                    };
                    date.offset_hour = digits(text, pos + 1..pos + 3).ok_or_else(bad)? as u8;
                    pos += 3;
                    if pos < text.len() {
                        // HH and mm are separated by an apostrophe
                        if text.get(pos..pos + 1) != Some("'") {
                            return Err(bad());
                        }
                        date.offset_minute =
                            digits(text, pos + 1..pos + 3).ok_or_else(bad)? as u8;
                        pos += 3;
                    }
                }
                _ => return Err(bad()),
            }
        }

        if pos != text.len() {
            return Err(bad());
        }

        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_date() {
        let date: PDFDate = "D:199812231952-08'00".parse().unwrap();
        assert_eq!(date.year, 1998);
        assert_eq!(date.month, 12);
        assert_eq!(date.day, 23);
        assert_eq!(date.hour, 19);
        assert_eq!(date.minute, 52);
        assert_eq!(date.second, 0);
        assert_eq!(date.offset, UtOffset::Behind);
        assert_eq!(date.offset_hour, 8);
    }

    #[test]
    fn parse_defaults() {
        let date: PDFDate = "D:2001".parse().unwrap();
        assert_eq!(
            (date.month, date.day, date.hour, date.offset),
            (1, 1, 0, UtOffset::Utc)
        );

        let date: PDFDate = "D:20010727133720".parse().unwrap();
        assert_eq!((date.hour, date.minute, date.second), (13, 37, 20));
    }

    #[test]
    fn trailing_apostrophe_is_tolerated() {
        let date: PDFDate = "D:20010727133720+02'00'".parse().unwrap();
        assert_eq!(date.offset_hour, 2);
        assert_eq!(date.offset_minute, 0);
    }

    #[test]
    fn round_trip() {
        let date: PDFDate = "D:19981223195200-08'00".parse().unwrap();
        assert_eq!(date.to_pdf_string(), "D:19981223195200-08'00");
        assert_eq!(date.to_pdf_string().parse::<PDFDate>().unwrap(), date);

        let utc: PDFDate = "D:20010727133720Z".parse().unwrap();
        assert_eq!(utc.to_pdf_string(), "D:20010727133720Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!("20010101".parse::<PDFDate>().is_err());
        assert!("D:20".parse::<PDFDate>().is_err());
        // a dangling half-field is not a date
        assert!("D:2001012".parse::<PDFDate>().is_err());
        assert!("D:20010101x".parse::<PDFDate>().is_err());
    }
}
