// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Selector-dispatched calldata.
//!
//! | Call                | Layout after the selector               | Bytes       |
//! |---------------------|-----------------------------------------|-------------|
//! | `register`          | `address, pk[4], proof[2]` (words)      | 4 + 7·32    |
//! | `initWithdraw`      | `index, amount, sig[2]` (words)         | 4 + 4·32    |
//! | `processWithdrawal` | `index` (word)                          | 4 + 32      |
//! | `post`              | compact batch, see [`super::batch`]     | 78 + 24·n   |

use super::{
    word_from_address, word_from_u128, word_from_u64, PublicKeyWords, ReceiptBatch, Reader,
    SignatureWords, WireError,
};
use crate::config::{SELECTOR_LENGTH, WORD_LENGTH};
use crate::crypto::selector;
use crate::types::{Address, UserIndex};

pub const REGISTER_SIGNATURE: &str = "register(address,uint256[4],uint256[2])";
pub const INIT_WITHDRAW_SIGNATURE: &str = "initWithdraw(uint64,uint128,uint256[2])";
pub const PROCESS_WITHDRAWAL_SIGNATURE: &str = "processWithdrawal(uint64)";
pub const POST_SIGNATURE: &str = "post()";

const REGISTER_BODY: usize = 7 * WORD_LENGTH;
const INIT_WITHDRAW_BODY: usize = 4 * WORD_LENGTH;
const PROCESS_WITHDRAWAL_BODY: usize = WORD_LENGTH;

/// A decoded call, ready for the contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Register {
        address: Address,
        public_key: PublicKeyWords,
        proof: SignatureWords,
    },
    InitWithdraw {
        index: UserIndex,
        amount: u128,
        signature: SignatureWords,
    },
    ProcessWithdrawal {
        index: UserIndex,
    },
    Post(ReceiptBatch),
}

impl Call {
    /// Short operation name, used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Call::Register { .. } => "register",
            Call::InitWithdraw { .. } => "initWithdraw",
            Call::ProcessWithdrawal { .. } => "processWithdrawal",
            Call::Post(_) => "post",
        }
    }

    fn selector(&self) -> [u8; SELECTOR_LENGTH] {
        match self {
            Call::Register { .. } => selector(REGISTER_SIGNATURE),
            Call::InitWithdraw { .. } => selector(INIT_WITHDRAW_SIGNATURE),
            Call::ProcessWithdrawal { .. } => selector(PROCESS_WITHDRAWAL_SIGNATURE),
            Call::Post(_) => selector(POST_SIGNATURE),
        }
    }

    /// Decode full calldata, selector included.
    pub fn decode(calldata: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(calldata, 0);
        let mut sel = [0u8; SELECTOR_LENGTH];
        sel.copy_from_slice(reader.take(SELECTOR_LENGTH)?);
        let body = &calldata[SELECTOR_LENGTH..];

        if sel == selector(POST_SIGNATURE) {
            return ReceiptBatch::decode_body(body).map(Call::Post);
        }

        let expect = |len: usize| {
            if body.len() == len {
                Ok(Reader::new(body, SELECTOR_LENGTH))
            } else {
                Err(WireError::LengthMismatch {
                    expected: SELECTOR_LENGTH + len,
                    got: calldata.len(),
                })
            }
        };

        if sel == selector(REGISTER_SIGNATURE) {
            let mut r = expect(REGISTER_BODY)?;
            Ok(Call::Register {
                address: r.address_word()?,
                public_key: r.words()?,
                proof: r.words()?,
            })
        } else if sel == selector(INIT_WITHDRAW_SIGNATURE) {
            let mut r = expect(INIT_WITHDRAW_BODY)?;
            Ok(Call::InitWithdraw {
                index: r.u64_word()?,
                amount: r.u128_word()?,
                signature: r.words()?,
            })
        } else if sel == selector(PROCESS_WITHDRAWAL_SIGNATURE) {
            let mut r = expect(PROCESS_WITHDRAWAL_BODY)?;
            Ok(Call::ProcessWithdrawal {
                index: r.u64_word()?,
            })
        } else {
            Err(WireError::UnknownSelector(sel))
        }
    }

    /// Encode to full calldata, selector included.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut out = self.selector().to_vec();
        match self {
            Call::Register {
                address,
                public_key,
                proof,
            } => {
                out.extend_from_slice(&word_from_address(address));
                public_key.iter().for_each(|w| out.extend_from_slice(w));
                proof.iter().for_each(|w| out.extend_from_slice(w));
            }
            Call::InitWithdraw {
                index,
                amount,
                signature,
            } => {
                out.extend_from_slice(&word_from_u64(*index));
                out.extend_from_slice(&word_from_u128(*amount));
                signature.iter().for_each(|w| out.extend_from_slice(w));
            }
            Call::ProcessWithdrawal { index } => {
                out.extend_from_slice(&word_from_u64(*index));
            }
            Call::Post(batch) => {
                out.extend_from_slice(&batch.encode_body()?);
            }
        }
        Ok(out)
    }
}
