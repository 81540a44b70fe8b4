// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context selector (C8): maps `(caller_ctx, call_site, receiver?)` to a
//! callee context, and `(ctx, alloc_site)` to an allocation context.
//! See `original_source/pythonstan/analysis/pointer/kcfa/context_selector.py`.

use crate::context::{AbstractContext, ContextPolicy, ObjOrProxy};
use crate::ids::CallSiteId;

/// Extra call-site facts the selector may use, depending on policy.
#[derive(Clone, Copy, Default)]
pub struct CallHints<'a> {
    pub receiver: Option<ObjOrProxy>,
    pub receiver_type: Option<&'a str>,
    pub callee_name: Option<&'a str>,
}

pub struct ContextSelector {
    policy: ContextPolicy,
    empty_context: AbstractContext,
}

impl ContextSelector {
    pub fn new(policy: ContextPolicy) -> Self {
        let empty_context = Self::create_empty_context(policy);
        ContextSelector { policy, empty_context }
    }

    pub fn policy(&self) -> ContextPolicy {
        self.policy
    }

    pub fn empty_context(&self) -> &AbstractContext {
        &self.empty_context
    }

    fn create_empty_context(policy: ContextPolicy) -> AbstractContext {
        use ContextPolicy::*;
        match policy {
            Insensitive => AbstractContext::CallString { sites: Vec::new(), k: 0 },
            Call1 => AbstractContext::CallString { sites: Vec::new(), k: 1 },
            Call2 => AbstractContext::CallString { sites: Vec::new(), k: 2 },
            Call3 => AbstractContext::CallString { sites: Vec::new(), k: 3 },
            Obj1 => AbstractContext::Object { sites: Vec::new(), depth: 1 },
            Obj2 => AbstractContext::Object { sites: Vec::new(), depth: 2 },
            Obj3 => AbstractContext::Object { sites: Vec::new(), depth: 3 },
            Type1 => AbstractContext::Type { types: Vec::new(), depth: 1 },
            Type2 => AbstractContext::Type { types: Vec::new(), depth: 2 },
            Type3 => AbstractContext::Type { types: Vec::new(), depth: 3 },
            Receiver1 => AbstractContext::Receiver { sites: Vec::new(), depth: 1 },
            Receiver2 => AbstractContext::Receiver { sites: Vec::new(), depth: 2 },
            Receiver3 => AbstractContext::Receiver { sites: Vec::new(), depth: 3 },
            HybridCall1Obj1 => AbstractContext::Hybrid {
                call_sites: Vec::new(),
                objects: Vec::new(),
                call_k: 1,
                obj_depth: 1,
            },
            HybridCall2Obj1 => AbstractContext::Hybrid {
                call_sites: Vec::new(),
                objects: Vec::new(),
                call_k: 2,
                obj_depth: 1,
            },
            HybridCall1Obj2 => AbstractContext::Hybrid {
                call_sites: Vec::new(),
                objects: Vec::new(),
                call_k: 1,
                obj_depth: 2,
            },
        }
    }

    /// Defensive reconstruction: if `ctx` was built under a different
    /// policy than this selector's own (e.g. a stale/foreign context), fall
    /// back to this selector's own empty context rather than misreading its
    /// shape (SPEC_FULL supplement #2).
    fn own_shape<'a>(&'a self, ctx: &'a AbstractContext) -> std::borrow::Cow<'a, AbstractContext> {
        use AbstractContext::*;
        let matches_shape = matches!(
            (&self.empty_context, ctx),
            (CallString { .. }, CallString { .. })
                | (Object { .. }, Object { .. })
                | (Type { .. }, Type { .. })
                | (Receiver { .. }, Receiver { .. })
                | (Hybrid { .. }, Hybrid { .. })
        );
        if matches_shape {
            std::borrow::Cow::Borrowed(ctx)
        } else {
            std::borrow::Cow::Borrowed(&self.empty_context)
        }
    }

    pub fn select_call_context(
        &self,
        caller_ctx: &AbstractContext,
        call_site: CallSiteId,
        hints: CallHints<'_>,
    ) -> AbstractContext {
        use ContextPolicy::*;
        match self.policy {
            Insensitive => caller_ctx.clone(),
            Call1 | Call2 | Call3 => self.own_shape(caller_ctx).append_call_site(call_site),
            Obj1 | Obj2 | Obj3 => {
                let ctx = self.own_shape(caller_ctx);
                let item = hints.receiver.clone().unwrap_or(ObjOrProxy::CallProxy(call_site));
                ctx.append_object(item)
            }
            Type1 | Type2 | Type3 => {
                let ctx = self.own_shape(caller_ctx);
                let ty = hints
                    .receiver_type
                    .map(str::to_owned)
                    .or_else(|| hints.callee_name.map(str::to_owned))
                    .unwrap_or_default();
                ctx.append_type(ty)
            }
            Receiver1 | Receiver2 | Receiver3 => {
                // Unlike k-obj, k-rcv has no call-site proxy fallback: with
                // no receiver, the context passes through unchanged
                // (SPEC_FULL supplement #3).
                let ctx = self.own_shape(caller_ctx);
                match hints.receiver.clone() {
                    Some(item) => ctx.append_receiver(item),
                    None => ctx.into_owned(),
                }
            }
            HybridCall1Obj1 | HybridCall2Obj1 | HybridCall1Obj2 => {
                let ctx = self.own_shape(caller_ctx).append_hybrid_call(call_site);
                match hints.receiver.clone() {
                    Some(item) => ctx.append_hybrid_object(item),
                    None => ctx,
                }
            }
        }
    }

    pub fn select_alloc_context(&self, current_ctx: &AbstractContext, alloc: ObjOrProxy) -> AbstractContext {
        use ContextPolicy::*;
        match self.policy {
            Obj1 | Obj2 | Obj3 => self.own_shape(current_ctx).append_object(alloc),
            HybridCall1Obj1 | HybridCall2Obj1 | HybridCall1Obj2 => {
                self.own_shape(current_ctx).append_hybrid_object(alloc)
            }
            _ => current_ctx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPolicy;

    fn cs(n: usize) -> CallSiteId {
        CallSiteId::new(n)
    }

    #[test]
    fn insensitive_policy_never_grows_the_context() {
        let sel = ContextSelector::new(ContextPolicy::Insensitive);
        let empty = sel.empty_context().clone();
        let next = sel.select_call_context(&empty, cs(0), CallHints::default());
        assert_eq!(next, empty);
        assert!(next.is_empty());
    }

    #[test]
    fn k_cfa_truncates_the_call_string_to_its_bound() {
        let sel = ContextSelector::new(ContextPolicy::Call2);
        let mut ctx = sel.empty_context().clone();
        for i in 0..5 {
            ctx = sel.select_call_context(&ctx, cs(i), CallHints::default());
        }
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx, AbstractContext::CallString { sites: vec![cs(3), cs(4)], k: 2 });
    }

    #[test]
    fn k_obj_falls_back_to_a_call_site_proxy_with_no_receiver() {
        let sel = ContextSelector::new(ContextPolicy::Obj1);
        let ctx = sel.empty_context().clone();
        let next = sel.select_call_context(&ctx, cs(7), CallHints::default());
        assert_eq!(next, AbstractContext::Object { sites: vec![ObjOrProxy::CallProxy(cs(7))], depth: 1 });
    }

    #[test]
    fn k_obj_uses_the_receiver_when_one_is_given() {
        let sel = ContextSelector::new(ContextPolicy::Obj2);
        let ctx = sel.empty_context().clone();
        let receiver = ObjOrProxy::Object(crate::ids::ObjectId::new(3));
        let hints = CallHints { receiver: Some(receiver.clone()), ..Default::default() };
        let next = sel.select_call_context(&ctx, cs(0), hints);
        assert_eq!(next, AbstractContext::Object { sites: vec![receiver], depth: 2 });
    }

    #[test]
    fn k_type_falls_back_from_receiver_type_to_callee_name() {
        let sel = ContextSelector::new(ContextPolicy::Type1);
        let ctx = sel.empty_context().clone();
        let hints = CallHints { callee_name: Some("Widget.draw"), ..Default::default() };
        let next = sel.select_call_context(&ctx, cs(0), hints);
        assert_eq!(next, AbstractContext::Type { types: vec!["Widget.draw".to_string()], depth: 1 });
    }

    #[test]
    fn k_rcv_passes_through_unchanged_with_no_receiver() {
        let sel = ContextSelector::new(ContextPolicy::Receiver1);
        let receiver = ObjOrProxy::Object(crate::ids::ObjectId::new(1));
        let ctx = AbstractContext::Receiver { sites: vec![receiver.clone()], depth: 1 };
        // Unlike k-obj, a missing receiver must NOT synthesize a call-site
        // proxy: the context is returned unchanged.
        let next = sel.select_call_context(&ctx, cs(9), CallHints::default());
        assert_eq!(next, ctx);
    }

    #[test]
    fn hybrid_policy_bounds_call_sites_and_objects_independently() {
        let sel = ContextSelector::new(ContextPolicy::HybridCall2Obj1);
        let mut ctx = sel.empty_context().clone();
        for i in 0..3 {
            let receiver = ObjOrProxy::Object(crate::ids::ObjectId::new(i as usize));
            let hints = CallHints { receiver: Some(receiver), ..Default::default() };
            ctx = sel.select_call_context(&ctx, cs(i), hints);
        }
        match ctx {
            AbstractContext::Hybrid { call_sites, objects, call_k, obj_depth } => {
                assert_eq!(call_sites, vec![cs(1), cs(2)]);
                assert_eq!(objects.len(), 1);
                assert_eq!(call_k, 2);
                assert_eq!(obj_depth, 1);
            }
            other => panic!("expected Hybrid context, got {other:?}"),
        }
    }

    #[test]
    fn own_shape_discards_a_context_built_under_a_foreign_policy() {
        let sel = ContextSelector::new(ContextPolicy::Call2);
        // A context shaped like k-obj fed into a k-cfa selector (e.g. after
        // a policy change mid-run) must not be misread as a call string.
        let foreign = AbstractContext::Object { sites: vec![ObjOrProxy::CallProxy(cs(0))], depth: 1 };
        let next = sel.select_call_context(&foreign, cs(5), CallHints::default());
        assert_eq!(next, AbstractContext::CallString { sites: vec![cs(5)], k: 2 });
    }
}
