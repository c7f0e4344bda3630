//! Run-length encoding over the lowercase ASCII alphabet.
//!
//! The codec is all-or-nothing: a single byte outside `a..=z` rejects the
//! whole input. Runs of three or more identical bytes are replaced by the
//! decimal digit count followed by the byte (`"aaaaa"` -> `"5a"`); runs of one
//! or two are emitted literally, since a count prefix would not be shorter.
//! Output therefore never exceeds the input length.

/// Compress `input` with run-length encoding.
///
/// Returns `None` if any byte is not a lowercase ASCII letter. Empty input is
/// success with empty output.
pub fn compress(input: &[u8]) -> Option<Vec<u8>> {
    if input.is_empty() {
        return Some(Vec::new());
    }

    let mut output = Vec::with_capacity(input.len());
    let mut current = input[0];
    let mut count: usize = 0;

    for &byte in input {
        if !byte.is_ascii_lowercase() {
            return None;
        }

        if byte == current {
            count += 1;
        } else {
            emit_run(current, count, &mut output);
            current = byte;
            count = 1;
        }
    }

    emit_run(current, count, &mut output);

    Some(output)
}

/// Emit one run: count digits + byte for runs of 3+, literal repeats otherwise.
fn emit_run(byte: u8, count: usize, output: &mut Vec<u8>) {
    if count > 2 {
        let mut digits = [0u8; 8];
        let mut n = count;
        let mut i = digits.len();
        while n > 0 {
            i -= 1;
            digits[i] = b'0' + (n % 10) as u8;
            n /= 10;
        }
        output.extend_from_slice(&digits[i..]);
        output.push(byte);
    } else {
        for _ in 0..count {
            output.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Expand a compressed sequence back to the original bytes.
    ///
    /// Count digits prefix the repeated byte; bare letters stand for
    /// themselves.
    fn expand(compressed: &[u8]) -> Vec<u8> {
        let mut output = Vec::new();
        let mut count: usize = 0;

        for &byte in compressed {
            if byte.is_ascii_digit() {
                count = count * 10 + (byte - b'0') as usize;
            } else {
                let repeat = if count == 0 { 1 } else { count };
                output.extend(std::iter::repeat(byte).take(repeat));
                count = 0;
            }
        }

        output
    }

    #[test]
    fn test_empty_input_is_success() {
        assert_eq!(compress(b""), Some(Vec::new()));
    }

    #[test]
    fn test_long_run_uses_count() {
        assert_eq!(compress(b"aaaaa").unwrap(), b"5a");
        assert_eq!(compress(b"aaa").unwrap(), b"3a");
    }

    #[test]
    fn test_short_runs_stay_literal() {
        assert_eq!(compress(b"aa").unwrap(), b"aa");
        assert_eq!(compress(b"abc").unwrap(), b"abc");
        assert_eq!(compress(b"z").unwrap(), b"z");
    }

    #[test]
    fn test_mixed_runs() {
        assert_eq!(compress(b"aaabbc").unwrap(), b"3abbc");
        assert_eq!(compress(b"abbbbbbbbbbbba").unwrap(), b"a12ba");
    }

    #[test]
    fn test_rejects_non_lowercase() {
        assert_eq!(compress(b"aAbb"), None);
        assert_eq!(compress(b"abc1"), None);
        assert_eq!(compress(b"hello world"), None);
        assert_eq!(compress(&[0xff]), None);
    }

    #[test]
    fn test_output_never_longer_than_input() {
        let inputs: &[&[u8]] = &[b"a", b"ab", b"aabbcc", b"aaaabbbb", b"abcdefg"];
        for input in inputs {
            let out = compress(input).unwrap();
            assert!(out.len() <= input.len(), "grew: {:?} -> {:?}", input, out);
        }
    }

    #[test]
    fn test_round_trip() {
        let inputs: &[&[u8]] = &[
            b"",
            b"a",
            b"aa",
            b"aaa",
            b"abc",
            b"aaaaa",
            b"aaabbbcccc",
            b"xyzzy",
        ];
        for input in inputs {
            let compressed = compress(input).unwrap();
            assert_eq!(expand(&compressed), *input, "input {:?}", input);
        }

        // A run long enough for a multi-digit count
        let long: Vec<u8> = std::iter::repeat(b'q').take(1234).collect();
        let compressed = compress(&long).unwrap();
        assert_eq!(compressed, b"1234q");
        assert_eq!(expand(&compressed), long);
    }
}
