//! Built-in chat modules and the config-driven chain builders.
//!
//! A configured name may stand for several instances, one per event kind it
//! applies to; the instances keep the configured relative order within each
//! kind's chain.

mod post;
mod pre;

pub use post::{
    BlocklistFilter, BroadcastResolver, ChannelResolver, ChatLog, DirectResolver,
    GradientDecorator, Placeholders, TagDecorator,
};
pub use pre::{DirectTarget, Sanitize, WordFilter};

use std::sync::Arc;

use super::channels::ChannelRegistry;
use super::module::{ChatModule, ModuleManager};
use super::stores::{Blocklists, Cosmetics};
use super::types::{PostChat, PostKind, PreChat, PreKind};
use crate::config::{ChatSection, PostModuleName, PreModuleName};
use crate::directory::PlayerDirectory;
use crate::session::SessionProvider;

/// Everything the built-in modules may read.
#[derive(Clone)]
pub struct ModuleDeps {
    pub directory: Arc<PlayerDirectory>,
    pub channels: Arc<ChannelRegistry>,
    pub sessions: Arc<dyn SessionProvider>,
    pub blocklists: Arc<Blocklists>,
    pub cosmetics: Arc<Cosmetics>,
}

pub fn install_pre(manager: &ModuleManager<PreChat>, cfg: &ChatSection, deps: &ModuleDeps) {
    const BOTH: [PreKind; 2] = [PreKind::Player, PreKind::Direct];

    for name in &cfg.pre_modules {
        let modules: Vec<Arc<dyn ChatModule<PreChat>>> = match name {
            PreModuleName::Sanitize => BOTH
                .iter()
                .map(|k| Arc::new(Sanitize::new(*k, cfg.max_message_len)) as Arc<dyn ChatModule<PreChat>>)
                .collect(),
            PreModuleName::WordFilter => BOTH
                .iter()
                .map(|k| Arc::new(WordFilter::new(*k, &cfg.blocked_words)) as Arc<dyn ChatModule<PreChat>>)
                .collect(),
            PreModuleName::DirectTarget => {
                vec![Arc::new(DirectTarget::new(Arc::clone(&deps.directory)))]
            }
        };
        for m in modules {
            manager.register(m);
        }
    }
}

pub fn install_post(manager: &ModuleManager<PostChat>, cfg: &ChatSection, deps: &ModuleDeps) {
    for name in &cfg.post_modules {
        let modules: Vec<Arc<dyn ChatModule<PostChat>>> = match name {
            PostModuleName::Blocklist => per_kind(|k| {
                Arc::new(BlocklistFilter::new(k, Arc::clone(&deps.blocklists)))
            }),
            PostModuleName::Channel => {
                vec![Arc::new(ChannelResolver::new(Arc::clone(&deps.channels)))]
            }
            PostModuleName::Direct => vec![Arc::new(DirectResolver)],
            PostModuleName::Broadcast => {
                vec![Arc::new(BroadcastResolver::new(Arc::clone(&deps.sessions)))]
            }
            PostModuleName::Placeholders => per_kind(|k| Arc::new(Placeholders::new(k))),
            PostModuleName::Tags => {
                per_kind(|k| Arc::new(TagDecorator::new(k, Arc::clone(&deps.cosmetics))))
            }
            PostModuleName::Gradient => {
                per_kind(|k| Arc::new(GradientDecorator::new(k, Arc::clone(&deps.cosmetics))))
            }
            PostModuleName::Log => per_kind(|k| Arc::new(ChatLog::new(k))),
        };
        for m in modules {
            manager.register(m);
        }
    }
}

fn per_kind(
    make: impl Fn(PostKind) -> Arc<dyn ChatModule<PostChat>>,
) -> Vec<Arc<dyn ChatModule<PostChat>>> {
    PostKind::ALL.iter().map(|k| make(*k)).collect()
}
