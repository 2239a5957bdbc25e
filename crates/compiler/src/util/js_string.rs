//! Double quoted JavaScript string literals.
use std::fmt::{Result as Ret, Write};

const QU: char = '"';
const BS: char = '\\';
const BB: char = 'b';
const TT: char = 't';
const NN: char = 'n';
const FF: char = 'f';
const RR: char = 'r';
const UU: char = 'u';
const __: char = '_';

// escape for every ascii byte, `_` means verbatim
static ESCAPED: [char; 128] = [
    // 0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    UU, UU, UU, UU, UU, UU, UU, UU, BB, TT, NN, UU, FF, RR, UU, UU, // 0
    UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, // 1
    __, __, QU, __, __, __, __, __, __, __, __, __, __, __, __, __, // 2
    __, __, __, __, __, __, __, __, __, __, __, __, __, __, __, __, // 3
    __, __, __, __, __, __, __, __, __, __, __, __, __, __, __, __, // 4
    __, __, __, __, __, __, __, __, __, __, __, __, BS, __, __, __, // 5
    __, __, __, __, __, __, __, __, __, __, __, __, __, __, __, __, // 6
    __, __, __, __, __, __, __, __, __, __, __, __, __, __, __, UU, // 7
];

// U+2028 and U+2029 end a line in older JS engines
fn escape_of(ch: char) -> char {
    match ch {
        '\u{2028}' | '\u{2029}' => UU,
        c if c.is_ascii() => ESCAPED[c as usize],
        _ => __,
    }
}

pub fn write_js_string<W: Write>(string: &str, mut w: W) -> Ret {
    w.write_char('"')?;
    let mut start = 0;
    for (index, ch) in string.char_indices() {
        let escape = escape_of(ch);
        if escape == __ {
            continue;
        }
        w.write_str(&string[start..index])?;
        w.write_char('\\')?;
        w.write_char(escape)?;
        if escape == UU {
            write!(w, "{:04x}", ch as u32)?;
        }
        start = index + ch.len_utf8();
    }
    w.write_str(&string[start..])?;
    w.write_char('"')
}

pub fn js_string(string: &str) -> String {
    let mut ret = String::with_capacity(string.len() + 2);
    // writing into a String cannot fail
    let _ = write_js_string(string, &mut ret);
    ret
}
