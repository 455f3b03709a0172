//! Voice registry: every voice the engine creates lives here, so a single
//! teardown call can reach all of them.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::voice::{Voice, VoiceId, VoiceKind};

/// A voice reclaimed by [`VoiceRegistry::stop_all`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimedVoice {
    pub id: VoiceId,
    pub kind: VoiceKind,
    /// Where the voice would have stopped on its own, if anywhere.
    pub scheduled_stop: Option<u64>,
    /// Where it was actually stopped.
    pub stopped_at: u64,
}

impl ReclaimedVoice {
    /// True when teardown cut the voice short of its own stop time.
    pub fn was_forced(&self) -> bool {
        self.scheduled_stop.is_none_or(|s| s > self.stopped_at)
    }
}

/// One frame of summed voice output, split by destination.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BusFrame {
    /// Everything, headed for the master bus.
    pub master: (f64, f64),
    /// The subset also routed into the spatial processor.
    pub spatial_send: (f64, f64),
}

#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: BTreeMap<VoiceId, Voice>,
    next_id: u64,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a voice and hand back its id.
    pub fn register(&mut self, voice: Voice) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.voices.insert(id, voice);
        id
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(&id)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn count(&self, kind: VoiceKind) -> usize {
        self.voices.values().filter(|v| v.kind == kind).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VoiceId, &Voice)> {
        self.voices.iter()
    }

    /// Drop voices whose own lifetime has elapsed.
    pub fn release_expired(&mut self, now: u64) -> usize {
        let before = self.voices.len();
        self.voices.retain(|id, v| {
            let keep = !v.is_expired(now);
            if !keep {
                debug!(voice = id.0, "voice finished");
            }
            keep
        });
        before - self.voices.len()
    }

    /// Stop and disconnect every voice at `now`, in id order.
    pub fn stop_all(&mut self, now: u64) -> Vec<ReclaimedVoice> {
        std::mem::take(&mut self.voices)
            .into_iter()
            .map(|(id, v)| ReclaimedVoice {
                id,
                kind: v.kind,
                scheduled_stop: v.stop_sample,
                stopped_at: now,
            })
            .collect()
    }

    /// Render one frame from every live voice.
    #[inline]
    pub fn next_frame(&mut self) -> BusFrame {
        let mut frame = BusFrame::default();
        for v in self.voices.values_mut() {
            let (l, r) = v.next_frame();
            frame.master.0 += l;
            frame.master.1 += r;
            if v.send_to_spatial {
                frame.spatial_send.0 += l;
                frame.spatial_send.1 += r;
            }
        }
        frame
    }
}
