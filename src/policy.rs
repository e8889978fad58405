/// Client code may only read settings under `public`.
use crate::types::{KeyChain, PUBLIC_KEY, VisibilityVerdict};

/// Decide whether `chain` is public and whether reading it from this document breaks the rule.
///
/// The verdict depends only on the effective chain, so a destructured
/// variable and the equivalent dotted expression always agree. The root
/// chain is not public.
pub fn evaluate(chain: &KeyChain, client_scoped: bool) -> VisibilityVerdict {
    let is_public = chain.first() == Some(PUBLIC_KEY);
    return VisibilityVerdict {
        is_public,
        violates_policy: client_scoped && !is_public,
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::scanner::ReferenceScanner;

    #[test]
    fn public_chain_is_allowed_on_client() {
        let verdict = evaluate(&KeyChain::new(["public", "x"]), true);
        assert!(verdict.is_public);
        assert!(!verdict.violates_policy);
    }

    #[test]
    fn private_chain_violates_only_on_client() {
        let chain = KeyChain::new(["secret"]);
        assert!(evaluate(&chain, true).violates_policy);
        assert!(!evaluate(&chain, false).violates_policy);
    }

    #[test]
    fn root_chain_is_not_public() {
        let verdict = evaluate(&KeyChain::root(), true);
        assert!(!verdict.is_public);
        assert!(verdict.violates_policy);
    }

    #[test]
    fn public_must_be_the_first_key() {
        assert!(evaluate(&KeyChain::new(["private", "public"]), true).violates_policy);
        assert!(evaluate(&KeyChain::new(["publicity"]), true).violates_policy);
    }

    #[test]
    fn direct_and_destructured_agree() {
        let scanner = ReferenceScanner::new("Meteor").unwrap();
        let text = "\
const { key } = Meteor.settings.private;
const { key: k2 } = Meteor.settings.public;
use(Meteor.settings.private.key, Meteor.settings.public.key);
";
        // The right-hand sides also match as one-key direct references; only
        // the two-key chains have a twin of the other kind.
        let targets: Vec<_> = scanner
            .scan(text)
            .flat_map(|r| return r.targets())
            .filter(|t| return t.chain.len() == 2)
            .collect();
        assert_eq!(targets.len(), 4);
        for client_scoped in [true, false] {
            for target in &targets {
                let twin = targets
                    .iter()
                    .find(|t| return t.chain == target.chain && t.origin != target.origin)
                    .unwrap();
                assert_eq!(
                    evaluate(&target.chain, client_scoped),
                    evaluate(&twin.chain, client_scoped),
                );
            }
        }
    }
}
