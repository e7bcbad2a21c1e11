//! Inscription envelopes in single-leaf tapscripts:
//!
//! ```text
//! <internal key> OP_CHECKSIG
//! OP_FALSE OP_IF "ord" 0x01 <content type> OP_FALSE <chunk> ... <chunk> OP_ENDIF
//! ```

use super::*;
use base64::Engine;
use bitcoin::key::XOnlyPublicKey;
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_ENDIF, OP_IF, OP_PUSHNUM_1};
use bitcoin::opcodes::{Opcode, OP_FALSE};
use bitcoin::script::{Builder, Instruction, PushBytes};
use bitcoin::secp256k1::{Secp256k1, Verification};
use bitcoin::taproot::{ControlBlock, LeafVersion, TaprootBuilder, TaprootSpendInfo};
use bitcoin::Script;
use datatypes::chain::MAX_SCRIPT_ELEMENT_SIZE;

pub const PROTOCOL_ID: &[u8; 3] = b"ord";
const CONTENT_TYPE_TAG: [u8; 1] = [1];

/// A leaf script together with everything needed to fund and spend it.
#[derive(Clone, Debug)]
pub struct InscriptionScript {
    pub leaf_script: ScriptBuf,
    pub internal_key: XOnlyPublicKey,
    pub spend_info: TaprootSpendInfo,
    pub control_block: ControlBlock,
}

impl InscriptionScript {
    /// The script-path P2TR address the commit pays into.
    pub fn address(&self, network: Network) -> Address {
        Address::p2tr_tweaked(self.spend_info.output_key(), network)
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        ScriptBuf::new_p2tr_tweaked(self.spend_info.output_key())
    }
}

/// Body split into pushes of at most 520 bytes, in order.
pub fn chunks(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    body.chunks(MAX_SCRIPT_ELEMENT_SIZE)
}

fn push_bytes(data: &[u8]) -> Result<&PushBytes> {
    <&PushBytes>::try_from(data).map_err(|e| Error::ScriptConstruction(e.to_string()))
}

pub fn build_leaf_script(
    envelope: &InscriptionEnvelope,
    internal_key: &XOnlyPublicKey,
) -> Result<ScriptBuf> {
    let content_type = envelope.content_type.as_bytes();
    if content_type.len() > MAX_SCRIPT_ELEMENT_SIZE {
        return Err(Error::ScriptConstruction(format!(
            "content type is {} bytes, limit is {}",
            content_type.len(),
            MAX_SCRIPT_ELEMENT_SIZE
        )));
    }

    let mut builder = Builder::new()
        .push_x_only_key(internal_key)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_FALSE)
        .push_opcode(OP_IF)
        .push_slice(PROTOCOL_ID)
        .push_slice(CONTENT_TYPE_TAG)
        .push_slice(push_bytes(content_type)?)
        .push_opcode(OP_FALSE);
    for chunk in chunks(&envelope.body) {
        builder = builder.push_slice(push_bytes(chunk)?);
    }
    let script = builder.push_opcode(OP_ENDIF).into_script();

    if let Some(Err(e)) = script.instructions().find(|i| i.is_err()) {
        return Err(Error::ScriptConstruction(e.to_string()));
    }
    Ok(script)
}

/// Builds the leaf script and the single-leaf tree committing to it.
pub fn encode<C: Verification>(
    secp: &Secp256k1<C>,
    envelope: &InscriptionEnvelope,
    internal_key: XOnlyPublicKey,
) -> Result<InscriptionScript> {
    let leaf_script = build_leaf_script(envelope, &internal_key)?;
    let spend_info = TaprootBuilder::new()
        .add_leaf(0, leaf_script.clone())
        .map_err(|e| Error::ScriptConstruction(e.to_string()))?
        .finalize(secp, internal_key)
        .map_err(|_| Error::ScriptConstruction("incomplete taproot tree".to_string()))?;
    let control_block = spend_info
        .control_block(&(leaf_script.clone(), LeafVersion::TapScript))
        .ok_or_else(|| Error::ScriptConstruction("leaf missing from tree".to_string()))?;

    Ok(InscriptionScript {
        leaf_script,
        internal_key,
        spend_info,
        control_block,
    })
}

fn is_false(ins: &Instruction) -> bool {
    matches!(ins, Instruction::PushBytes(b) if b.is_empty())
}

fn is_op(ins: &Instruction, op: Opcode) -> bool {
    matches!(ins, Instruction::Op(o) if *o == op)
}

/// Reads every envelope in `script`. Unknown tags are skipped.
pub fn decode_leaf_script(script: &Script) -> Result<Vec<InscriptionEnvelope>> {
    let instructions = script
        .instructions()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::ScriptConstruction(e.to_string()))?;

    let mut envelopes = Vec::new();
    let mut i = 0;
    while i + 2 < instructions.len() {
        let starts_envelope = is_false(&instructions[i])
            && is_op(&instructions[i + 1], OP_IF)
            && matches!(&instructions[i + 2], Instruction::PushBytes(b) if b.as_bytes() == PROTOCOL_ID);
        if !starts_envelope {
            i += 1;
            continue;
        }

        let mut j = i + 3;
        let mut content_type = String::new();
        let mut body = Vec::new();
        let mut in_body = false;
        let mut closed = false;
        while j < instructions.len() {
            let ins = &instructions[j];
            if is_op(ins, OP_ENDIF) {
                closed = true;
                break;
            }
            if in_body {
                if let Instruction::PushBytes(b) = ins {
                    body.extend_from_slice(b.as_bytes());
                }
                j += 1;
                continue;
            }
            if is_false(ins) {
                in_body = true;
                j += 1;
                continue;
            }

            let is_content_type_tag = is_op(ins, OP_PUSHNUM_1)
                || matches!(ins, Instruction::PushBytes(b) if b.as_bytes() == CONTENT_TYPE_TAG);
            if is_content_type_tag {
                if let Some(Instruction::PushBytes(v)) = instructions.get(j + 1) {
                    content_type = String::from_utf8_lossy(v.as_bytes()).into_owned();
                }
            }
            // tag and its value
            j += 2;
        }

        if !closed {
            return Err(Error::ScriptConstruction(
                "inscription envelope is not closed".to_string(),
            ));
        }
        envelopes.push(InscriptionEnvelope { content_type, body });
        i = j + 1;
    }
    Ok(envelopes)
}

fn percent_decode(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .ok_or_else(|| Error::MalformedDataUrl("truncated escape".to_string()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| Error::MalformedDataUrl(format!("bad escape %{hex}")))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Parses `data:<mime>[;base64],<payload>`. An empty mime type means
/// `text/plain;charset=US-ASCII`.
pub fn from_data_url(url: &str) -> Result<InscriptionEnvelope> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| Error::MalformedDataUrl("missing data: scheme".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::MalformedDataUrl("missing ',' separator".to_string()))?;

    let (mime, is_base64) = match meta.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (meta, false),
    };
    let mime = if mime.is_empty() {
        "text/plain;charset=US-ASCII"
    } else {
        mime
    };
    if !mime.contains('/') {
        return Err(Error::MalformedDataUrl(format!("bad mime type {mime:?}")));
    }

    let body = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::MalformedDataUrl(e.to_string()))?
    } else {
        percent_decode(payload)?
    };

    Ok(InscriptionEnvelope::new(mime, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_key;
    use crate::vsize::InscriptionSize;

    fn envelope(len: usize) -> InscriptionEnvelope {
        let body: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        InscriptionEnvelope::new("text/plain", body)
    }

    #[test]
    fn leaf_script_layout() {
        let key = test_key(1);
        let env = InscriptionEnvelope::new("text/plain", b"hi".to_vec());
        let script = build_leaf_script(&env, &key.x_only()).unwrap();

        let mut expected = vec![0x20];
        expected.extend_from_slice(&key.x_only().serialize());
        expected.extend_from_slice(&[0xac, 0x00, 0x63, 0x03, b'o', b'r', b'd', 0x01, 0x01, 0x0a]);
        expected.extend_from_slice(b"text/plain");
        expected.extend_from_slice(&[0x00, 0x02, b'h', b'i', 0x68]);
        assert_eq!(script.as_bytes(), &expected[..]);
    }

    #[test]
    fn chunks_reassemble_body() {
        let key = test_key(2);
        for len in [0, 1, 75, 76, 255, 256, 519, 520, 521, 1000, 1040, 1041, 4000] {
            let env = envelope(len);
            assert_eq!(chunks(&env.body).count(), len.div_ceil(520));
            assert!(chunks(&env.body).all(|c| c.len() <= 520));

            let script = build_leaf_script(&env, &key.x_only()).unwrap();
            assert_eq!(script.len() as u64, InscriptionSize::of(&env).leaf_script_len());
            let decoded = decode_leaf_script(&script).unwrap();
            assert_eq!(decoded, vec![env]);
        }
    }

    #[test]
    fn long_content_type_size() {
        let key = test_key(2);
        let env = InscriptionEnvelope::new("application/".to_string() + &"x".repeat(90), vec![7; 300]);
        let script = build_leaf_script(&env, &key.x_only()).unwrap();
        assert_eq!(script.len() as u64, InscriptionSize::of(&env).leaf_script_len());
    }

    #[test]
    fn tree_commits_to_leaf() {
        let key = test_key(3);
        let env = envelope(1000);
        let ins = encode(key.secp(), &env, key.x_only()).unwrap();

        assert_eq!(ins.spend_info.internal_key(), key.x_only());
        assert!(ins.control_block.verify_taproot_commitment(
            key.secp(),
            ins.spend_info.output_key().to_inner(),
            &ins.leaf_script,
        ));
        assert_eq!(ins.control_block.leaf_version, LeafVersion::TapScript);
        assert_eq!(ins.control_block.leaf_version.to_consensus(), 0xc0);

        let addr = ins.address(Network::Bitcoin);
        assert_eq!(addr.script_pubkey(), ins.script_pubkey());
        assert_ne!(addr, key.p2tr_address(Network::Bitcoin));
    }

    #[test]
    fn oversized_content_type_is_rejected() {
        let key = test_key(4);
        let env = InscriptionEnvelope::new("x/".to_string() + &"y".repeat(600), vec![1]);
        assert!(matches!(
            build_leaf_script(&env, &key.x_only()),
            Err(Error::ScriptConstruction(_))
        ));
    }

    #[test]
    fn data_urls() {
        let env = from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(env.content_type, "image/png");
        assert_eq!(env.body, vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);

        let env = from_data_url("data:text/plain;charset=utf-8,hello%20world").unwrap();
        assert_eq!(env.content_type, "text/plain;charset=utf-8");
        assert_eq!(env.body, b"hello world".to_vec());

        let env = from_data_url("data:,abc").unwrap();
        assert_eq!(env.content_type, "text/plain;charset=US-ASCII");
    }

    #[test]
    fn malformed_data_urls() {
        for bad in [
            "image/png;base64,AAAA",
            "data:image/png;base64",
            "data:image/png;base64,!!!",
            "data:nonsense,abc",
            "data:text/plain,%zz",
        ] {
            assert!(
                matches!(from_data_url(bad), Err(Error::MalformedDataUrl(_))),
                "{bad}"
            );
        }
    }
}
