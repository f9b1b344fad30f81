//! チャネル選択モジュール
//!
//! 現状は有効チャネルからの一様ランダム選択。`Channel::weight` は保持するだけで使わない。

pub mod selector;

pub use selector::ChannelSelector;
