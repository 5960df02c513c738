//! Rendering a finished instruction stream to text.
//!
//! Every opcode and numeric immediate is spelled in the three-symbol
//! `F`/`L`/`T` alphabet; the three format modes differ only in what
//! whitespace, if any, gets inserted between instructions.

use thiserror::Error;

use crate::instr::Instr;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("column width must be a positive integer, got {0}")]
    InvalidColumn(usize),
}

/// Sign-and-magnitude encoding shared by every numeric immediate:
/// `F`/`L` for non-negative/negative, magnitude bits MSB-first with `F`=0
/// and `L`=1, terminated by `T`. Zero's magnitude is the empty string —
/// the bit-producing loop never runs when the value is already zero,
/// matching the original compiler's `intToBinary` exactly (not some
/// zero-padded stand-in).
fn encode_magnitude(mut value: u64) -> String {
    let mut bits = Vec::new();
    while value != 0 {
        bits.push(if value & 1 == 1 { 'L' } else { 'F' });
        value >>= 1;
    }
    bits.reverse();
    bits.into_iter().collect()
}

fn encode_signed(value: i64) -> String {
    let sign = if value >= 0 { 'F' } else { 'L' };
    format!("{sign}{}T", encode_magnitude(value.unsigned_abs()))
}

/// Label ids, `COPY`/`SLIDE` counts, and call targets are never negative,
/// so they always carry the positive sign bit.
fn encode_unsigned(value: u32) -> String {
    format!("F{}T", encode_magnitude(value as u64))
}

fn jump_target(label: Option<u32>) -> u32 {
    label.expect("rendered a branch instruction with an unconfirmed label")
}

fn render(instr: &Instr) -> String {
    match instr {
        Instr::Push(v) => format!("FF{}", encode_signed(*v)),
        Instr::Dup => "FTF".to_string(),
        Instr::Swap => "FTL".to_string(),
        Instr::Discard => "FTT".to_string(),
        Instr::Copy(k) => format!("FLF{}", encode_unsigned(*k)),
        Instr::Slide(k) => format!("FLT{}", encode_unsigned(*k)),
        Instr::Add => "LFFF".to_string(),
        Instr::Sub => "LFFL".to_string(),
        Instr::Mul => "LFFT".to_string(),
        Instr::Div => "LFLF".to_string(),
        Instr::Mod => "LFLL".to_string(),
        Instr::Store => "LLF".to_string(),
        Instr::Retrieve => "LLL".to_string(),
        Instr::Getc => "LTLF".to_string(),
        Instr::Getn => "LTLL".to_string(),
        Instr::Putc => "LTFF".to_string(),
        Instr::Putn => "LTFL".to_string(),
        Instr::Label(l) => format!("TFF{}", encode_unsigned(*l)),
        Instr::Jump(l) => format!("TFT{}", encode_unsigned(jump_target(*l))),
        Instr::JumpWhenZero(l) => format!("TLF{}", encode_unsigned(jump_target(*l))),
        Instr::JumpWhenNegative(l) => format!("TLL{}", encode_unsigned(jump_target(*l))),
        Instr::Callsub(l) => format!("TFL{}", encode_unsigned(*l)),
        Instr::Endsub => "TLT".to_string(),
        Instr::End => "TTT".to_string(),
    }
}

/// `FormatOneLine`: every instruction back to back, no separators.
pub fn format_one_line(instrs: &[Instr]) -> String {
    instrs.iter().map(render).collect()
}

/// `FormatRaw`: one instruction per line.
pub fn format_pretty(instrs: &[Instr]) -> String {
    instrs.iter().map(render).collect::<Vec<_>>().join("\n")
}

/// `FormatSquere` (the original's name, corrected here): wraps the
/// one-line rendering to `column` characters, inserting a `\n` after
/// every `column`-th character. If the total length is an exact multiple
/// of `column`, the result ends with a trailing newline — that's the
/// original's literal behavior, not cleaned up here.
pub fn format_square(instrs: &[Instr], column: usize) -> Result<String, FormatError> {
    if column == 0 {
        return Err(FormatError::InvalidColumn(column));
    }
    let joined = format_one_line(instrs);
    let mut out = String::with_capacity(joined.len() + joined.len() / column);
    for (i, c) in joined.chars().enumerate() {
        out.push(c);
        if (i + 1) % column == 0 {
            out.push('\n');
        }
    }
    Ok(out)
}

/// The three `-format=` spellings a driver's CLI accepts: `oneline`,
/// `pretty`, or a positive column width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    OneLine,
    Pretty,
    Square(usize),
}

pub fn render_program(instrs: &[Instr], format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::OneLine => Ok(format_one_line(instrs)),
        OutputFormat::Pretty => Ok(format_pretty(instrs)),
        OutputFormat::Square(column) => format_square(instrs, column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_zero_has_empty_magnitude() {
        assert_eq!(render(&Instr::Push(0)), "FFFT");
    }

    #[test]
    fn push_positive_and_negative() {
        assert_eq!(render(&Instr::Push(1)), "FFFLT");
        assert_eq!(render(&Instr::Push(-1)), "FFLLT");
    }

    #[test]
    fn one_line_has_no_separators() {
        let instrs = vec![Instr::Push(1), Instr::Push(2), Instr::Add, Instr::End];
        let text = format_one_line(&instrs);
        assert!(!text.contains('\n'));
    }

    #[test]
    fn pretty_is_one_instruction_per_line() {
        let instrs = vec![Instr::Push(1), Instr::Push(2), Instr::Add];
        assert_eq!(format_pretty(&instrs).lines().count(), 3);
    }

    #[test]
    fn square_rejects_zero_column() {
        let instrs = vec![Instr::End];
        assert_eq!(format_square(&instrs, 0), Err(FormatError::InvalidColumn(0)));
    }

    #[test]
    fn square_wraps_every_n_characters() {
        let instrs = vec![Instr::Dup, Instr::Dup]; // "FTF" + "FTF" = "FTFFTF", 6 chars
        let wrapped = format_square(&instrs, 3).unwrap();
        assert_eq!(wrapped, "FTF\nFTF\n");
    }

    #[test]
    fn all_formats_agree_modulo_whitespace() {
        let instrs = vec![Instr::Push(42), Instr::Putn, Instr::End];
        let one_line = format_one_line(&instrs);
        let pretty: String = format_pretty(&instrs).chars().filter(|c| !c.is_whitespace()).collect();
        let square: String =
            format_square(&instrs, 5).unwrap().chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(one_line, pretty);
        assert_eq!(one_line, square);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn sample_instrs(seed: u8) -> Vec<Instr> {
        let n = (seed % 5) as i64 + 1;
        let mut v = vec![Instr::Push(n), Instr::Push(-n)];
        v.push(if seed % 2 == 0 { Instr::Add } else { Instr::Sub });
        v.push(Instr::Putn);
        v.push(Instr::End);
        v
    }

    #[quickcheck]
    fn whitespace_insensitive_round_trip(seed: u8, column: std::num::NonZeroU8) -> bool {
        let instrs = sample_instrs(seed);
        let one_line = format_one_line(&instrs);
        let pretty: String = format_pretty(&instrs).chars().filter(|c| !c.is_whitespace()).collect();
        let square: String = format_square(&instrs, column.get() as usize)
            .unwrap()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        one_line == pretty && one_line == square
    }
}
