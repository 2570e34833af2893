use ethereum_types::{Address, U256};
use keccak_hash::keccak;

use crate::clients::eth::errors::CalldataEncodeError;

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Address(Address),
    Uint(U256),
    String(String),
}

fn parse_signature(signature: &str) -> Result<(String, Vec<String>), CalldataEncodeError> {
    let sig = signature.trim().trim_start_matches("function ");
    let (name, params) = sig
        .split_once('(')
        .ok_or_else(|| CalldataEncodeError::ParseError(signature.to_owned()))?;
    let params = params
        .strip_suffix(')')
        .ok_or_else(|| CalldataEncodeError::ParseError(signature.to_owned()))?;
    let params: Vec<String> = if params.trim().is_empty() {
        Vec::new()
    } else {
        params
            .split(',')
            .map(|x| {
                let x = x.trim();
                x.split_once(' ').map_or(x, |(ty, _)| ty).to_string()
            })
            .collect()
    };
    Ok((name.trim().to_string(), params))
}

pub fn compute_function_selector(name: &str, params: &[String]) -> [u8; 4] {
    let normalized_signature = format!("{name}({})", params.join(","));
    let hash = keccak(normalized_signature.as_bytes());

    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Encodes a call to `signature` (e.g. `"transfer(address,uint256)"`) with `values`.
pub fn encode_calldata(
    signature: &str,
    values: &[Value],
) -> Result<Vec<u8>, CalldataEncodeError> {
    let (name, params) = parse_signature(signature)?;

    if params.len() != values.len() {
        return Err(CalldataEncodeError::WrongArgumentLength(format!(
            "{signature}: expected {}, got {}",
            params.len(),
            values.len()
        )));
    }

    let function_selector = compute_function_selector(&name, &params);
    let calldata = encode_tuple(values);
    let mut with_selector = function_selector.to_vec();

    with_selector.extend_from_slice(&calldata);

    Ok(with_selector)
}

/// Head/tail ABI encoding: every value takes one 32-byte head word, dynamic
/// values store an offset there and append their payload to the tail.
/// Also used for constructor arguments, which carry no selector.
pub fn encode_tuple(values: &[Value]) -> Vec<u8> {
    let mut current_offset = 0;
    let mut current_dynamic_offset = values.len() * 32;

    let mut ret = vec![0; current_dynamic_offset];

    for value in values {
        match value {
            Value::Address(h160) => {
                write_u256(&mut ret, address_to_word(*h160), current_offset);
            }
            Value::Uint(u256) => {
                write_u256(&mut ret, *u256, current_offset);
            }
            Value::String(string_value) => {
                write_u256(&mut ret, U256::from(current_dynamic_offset), current_offset);

                let bytes_encoding = encode_bytes(string_value.as_bytes());
                ret.extend_from_slice(&bytes_encoding);
                current_dynamic_offset += bytes_encoding.len();
            }
        }

        current_offset += 32;
    }

    ret
}

/// Decodes the first return word of a call as a `uint256`.
pub fn decode_u256(output: &[u8]) -> Result<U256, CalldataEncodeError> {
    let word = output
        .get(..32)
        .ok_or(CalldataEncodeError::ShortReturnData(output.len()))?;
    Ok(U256::from_big_endian(word))
}

fn write_u256(values: &mut [u8], number: U256, offset: usize) {
    values[offset..offset + 32].copy_from_slice(&number.to_big_endian());
}

fn encode_bytes(values: &[u8]) -> Vec<u8> {
    let mut ret = U256::from(values.len()).to_big_endian().to_vec();

    ret.extend_from_slice(values);
    // Pad the payload to a whole number of words.
    let padding = (32 - values.len() % 32) % 32;
    ret.resize(ret.len() + padding, 0);

    ret
}

fn address_to_word(address: Address) -> U256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    U256::from_big_endian(&word)
}
