//! Property tests for registration keys

use fluentai_ioc::{Discriminator, EntryKey};
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

proptest! {
    #[test]
    fn string_keys_match_by_value(text in ".*") {
        let borrowed = Discriminator::from(text.as_str());
        let owned = Discriminator::from(text.clone());
        prop_assert_eq!(&borrowed, &owned);
        prop_assert_eq!(hash_of(&borrowed), hash_of(&owned));
    }

    #[test]
    fn integer_keys_agree_with_their_values(a in any::<i64>(), b in any::<i64>()) {
        let left = Discriminator::from(a);
        let right = Discriminator::from(b);
        prop_assert_eq!(left == right, a == b);
        if a == b {
            prop_assert_eq!(hash_of(&left), hash_of(&right));
        }
    }

    #[test]
    fn keys_of_different_types_never_match(n in any::<u32>()) {
        prop_assert_ne!(Discriminator::from(n), Discriminator::from(u64::from(n)));
        prop_assert_ne!(Discriminator::from(n), Discriminator::from(n.to_string()));
    }

    #[test]
    fn entry_keys_compare_type_and_key(text in "[a-z]{0,8}") {
        let keyed = EntryKey::of::<String>(Some(text.as_str().into()));
        prop_assert_eq!(&keyed, &EntryKey::of::<String>(Some(text.clone().into())));
        prop_assert_ne!(&keyed, &EntryKey::of::<str>(Some(text.as_str().into())));
        prop_assert_ne!(&keyed, &EntryKey::of::<String>(None));
        let quoted = format!("{:?}", text);
        prop_assert!(keyed.to_string().contains(&quoted));
    }
}
