//! Parser for header field names and values.
//!
//! Field names are tokens and field values are sequences of visible characters,
//! spaces and tabs, both defined in [RFC 7230](https://tools.ietf.org/html/rfc7230#section-3.2).

use nom::bytes::complete::{take_while, take_while1};
use nom::{Finish, IResult, InputLength};

macro_rules! byte_table {
    ($($c:expr),+ $(,)?) => {
        {
            let mut table = [false; 256];
            $(table[$c as usize] = true;)+
            table
        }

    };
}

const RFC_7230_TOKEN_SPECIAL: [bool; 256] = byte_table![
    b'!', b'#', b'$', b'%', b'&', b'\'', b'*', b'+', b'-', b'.', b'^', b'_', b'`', b'|', b'~'
];

const fn is_token(c: u8) -> bool {
    c.is_ascii_alphanumeric() || RFC_7230_TOKEN_SPECIAL[c as usize]
}

// field-vchar (VCHAR / obs-text), SP and HTAB.
const fn is_field_content(c: u8) -> bool {
    c == b' ' || c == b'\t' || (c >= 0x21 && c < 0x7F) || (c > 0x7F)
}

pub(crate) fn token(v: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_token)(v)
}

pub(crate) fn field_value(v: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(is_field_content)(v)
}



pub(crate) trait NoTail<O, E> {
    fn no_tail(self) -> Result<O, E>;
}

impl<I, O> NoTail<O, nom::error::Error<I>> for IResult<I, O>
where
    I: InputLength,
{
    fn no_tail(self) -> Result<O, nom::error::Error<I>> {
        match self.finish() {
            Ok((i, o)) if i.input_len() == 0 => Ok(o),
            Ok((i, _)) => Err(nom::error::Error::new(i, nom::error::ErrorKind::Eof)),
            Err(e) => Err(e),
        }
    }
}
