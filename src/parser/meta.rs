use nom::{
    branch::alt,
    bytes::streaming::{tag, take, take_until, take_while},
    character::streaming::{crlf, space1},
    combinator::{map, map_res, value},
    multi::many0,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use super::{parse_u32, Response, ReturnCode};
use crate::error::Error;

/// Hard cap for a response header line; nothing the meta protocol emits
/// comes close, so a longer line is not a frame.
const MAX_LINE_LENGTH: usize = 2048;

/// Attempts to decode one response frame from the front of `buf`.
///
/// Returns `Ok(Some((consumed, response)))` for a complete frame,
/// `Ok(None)` when more bytes are needed (nothing is consumed), and
/// `Err` for input that cannot be a meta-protocol frame.
pub fn parse_meta_response(buf: &[u8]) -> Result<Option<(usize, Response)>, Error> {
    match meta_response(buf) {
        Ok((remaining, response)) => Ok(Some((buf.len() - remaining.len(), response))),
        Err(nom::Err::Incomplete(_)) => {
            if header_overflows(buf) {
                Err(Error::MalformedFrame(format!(
                    "header line exceeds {} bytes",
                    MAX_LINE_LENGTH
                )))
            } else {
                Ok(None)
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(Error::MalformedFrame(e.code.description().to_string()))
        }
    }
}

fn header_overflows(buf: &[u8]) -> bool {
    buf.len() > MAX_LINE_LENGTH && !buf[..MAX_LINE_LENGTH].windows(2).any(|w| w == b"\r\n")
}

fn meta_response(buf: &[u8]) -> IResult<&[u8], Response> {
    alt((value_response, status_response, error_response))(buf)
}

fn status_code(buf: &[u8]) -> IResult<&[u8], ReturnCode> {
    alt((
        value(ReturnCode::Stored, tag(b"HD")),
        value(ReturnCode::NotStored, tag(b"NS")),
        value(ReturnCode::Exists, tag(b"EX")),
        value(ReturnCode::NotFound, tag(b"NF")),
        value(ReturnCode::Miss, tag(b"EN")),
    ))(buf)
}

// HD/NS/EX/NF/EN <flags>*\r\n
fn status_response(buf: &[u8]) -> IResult<&[u8], Response> {
    let (buf, code) = status_code(buf)?;
    let (buf, flags) = flag_echoes(buf)?;
    let (buf, _) = crlf(buf)?;
    Ok((
        buf,
        Response {
            code,
            flags,
            data: None,
        },
    ))
}

// VA <size> <flags>*\r\n<data>\r\n
//
// The value block is measured by the declared size, never by searching for
// \r\n: the data may itself contain CRLF.
fn value_response(buf: &[u8]) -> IResult<&[u8], Response> {
    let (buf, _) = tag(b"VA ")(buf)?;
    let (buf, size) = parse_u32(buf)?;
    let (buf, flags) = flag_echoes(buf)?;
    let (buf, _) = crlf(buf)?;
    let (buf, data) = terminated(take(size), crlf)(buf)?;
    Ok((
        buf,
        Response {
            code: ReturnCode::Value,
            flags,
            data: Some(data.to_vec()),
        },
    ))
}

fn error_response(buf: &[u8]) -> IResult<&[u8], Response> {
    let (buf, code) = terminated(
        alt((
            map_res(preceded(tag(b"CLIENT_ERROR "), take_until("\r\n")), |s| {
                std::str::from_utf8(s).map(|s| ReturnCode::ClientError(s.to_string()))
            }),
            map_res(preceded(tag(b"SERVER_ERROR "), take_until("\r\n")), |s| {
                std::str::from_utf8(s).map(|s| ReturnCode::ServerError(s.to_string()))
            }),
            value(ReturnCode::NonexistentCommand, tag(b"ERROR")),
        )),
        crlf,
    )(buf)?;
    Ok((
        buf,
        Response {
            code,
            flags: Vec::new(),
            data: None,
        },
    ))
}

fn flag_echoes(buf: &[u8]) -> IResult<&[u8], Vec<(u8, Vec<u8>)>> {
    many0(map(
        tuple((
            space1,
            take(1usize),
            take_while(|c: u8| c != b'\r' && c != b' '),
        )),
        |(_, token, rest): (_, &[u8], &[u8])| (token[0], rest.to_vec()),
    ))(buf)
}
