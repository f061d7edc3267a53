/*
Routing tree
============

Audio objects own channels, channels own a contiguous slice of recyclings,
and recyclings pool the audio signals produced into them. Channels may link
to an input channel of a downstream audio; a run started on a channel recurses
through that link chain, manufacturing one child recycling context per hop.

Recycling indices are global across the tree: a recycling context identifies
the subtree it governs by the half-open index range, and child-context lookup
matches on the linked channel's first recycling.
*/

pub mod audio;
pub mod channel;
pub mod recycling;
pub mod run;
pub mod signal;

pub use audio::Audio;
pub use channel::Channel;
pub use recycling::Recycling;
pub use run::{cancel_run, chain_identities, for_each_in_chain, init_run, start_run};
pub use signal::{AudioSignal, Envelope};
