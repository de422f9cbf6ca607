#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::kdf::derive_subkey;
    use crate::{KDF_CONTEXT, PrivateKey, derive_session_key, envelope, rc4};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        // Either side of a pair derives the same session key
        #[test]
        fn test_dh_symmetry(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            let alice = PrivateKey::from_bytes(a);
            let bob = PrivateKey::from_bytes(b);

            let ab = derive_session_key(&alice, &bob.public_key(), KDF_CONTEXT);
            let ba = derive_session_key(&bob, &alice.public_key(), KDF_CONTEXT);
            prop_assert_eq!(ab.unwrap(), ba.unwrap());
        }

        #[test]
        fn test_rc4_involution(
            key in proptest::collection::vec(any::<u8>(), 1..300),
            message in any::<Vec<u8>>()
        ) {
            let ciphertext = rc4::encrypt(&key, &message).unwrap();
            prop_assert_eq!(ciphertext.len(), message.len());
            prop_assert_eq!(rc4::decrypt(&key, &ciphertext).unwrap(), message);
        }

        #[test]
        fn test_kdf_determinism(
            master in any::<[u8; 32]>(),
            subkey_id in any::<u64>(),
            context in "[a-z]{0,12}"
        ) {
            let first = derive_subkey(&master, subkey_id, &context, 32).unwrap();
            let second = derive_subkey(&master, subkey_id, &context, 32).unwrap();
            prop_assert_eq!(first.as_slice(), second.as_slice());
        }

        #[test]
        fn test_envelope_inverts(bytes in any::<Vec<u8>>()) {
            let encoded = envelope::encode(&bytes);
            prop_assert_eq!(encoded.len(), bytes.len() * 2);
            prop_assert_eq!(envelope::decode(&encoded).unwrap(), bytes);
        }
    }
}
