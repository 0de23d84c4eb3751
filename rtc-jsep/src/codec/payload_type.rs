use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use super::{Codec, PayloadType};

/// Dynamic ranges searched, in order, when a preferred number is taken.
const DYNAMIC_RANGES: [RangeInclusive<PayloadType>; 2] = [96..=127, 35..=63];

/// is_dynamic reports whether `pt` can only be interpreted through an
/// `a=rtpmap` line.
pub(crate) fn is_dynamic(pt: PayloadType) -> bool {
    DYNAMIC_RANGES.iter().any(|range| range.contains(&pt))
}

/// Hands out payload types of one m-section without ever giving the same
/// number twice.
#[derive(Default, Debug, Clone)]
pub(crate) struct PayloadTypeAllocator {
    used: BTreeSet<PayloadType>,
}

impl PayloadTypeAllocator {
    pub(crate) fn new() -> Self {
        PayloadTypeAllocator::default()
    }

    pub(crate) fn is_free(&self, pt: PayloadType) -> bool {
        pt <= 127 && !self.used.contains(&pt)
    }

    /// claim takes `pt` if it is still free.
    pub(crate) fn claim(&mut self, pt: PayloadType) -> bool {
        if !self.is_free(pt) {
            return false;
        }
        self.used.insert(pt)
    }

    /// allocate returns `preferred` if free, otherwise the first free
    /// dynamic payload type.
    pub(crate) fn allocate(&mut self, preferred: PayloadType) -> Option<PayloadType> {
        if self.claim(preferred) {
            return Some(preferred);
        }
        for range in DYNAMIC_RANGES {
            for pt in range {
                if self.claim(pt) {
                    return Some(pt);
                }
            }
        }
        None
    }
}

/// assign_payload_types resolves the working payload type of every enabled
/// codec of one track.
///
/// Negotiated payload types claim first, then the RED/ULPFEC/RED-RTX
/// numbers shared by all video codecs, then everything else by preference
/// order. A codec that cannot get a number is disabled.
pub(crate) fn assign_payload_types(codecs: &mut [Codec]) {
    let mut allocator = PayloadTypeAllocator::new();

    for codec in codecs.iter_mut().filter(|c| c.is_enabled()) {
        let d = codec.description_mut();
        if d.negotiated_pt && !allocator.claim(d.pt) {
            log::debug!("negotiated payload type {} of {} collides", d.pt, d.name);
            d.negotiated_pt = false;
        }
    }
    for codec in codecs.iter_mut().filter(|c| c.is_enabled()) {
        if let Codec::Video(v) = codec {
            if v.negotiated_rtx && !v.rtx_pt.is_some_and(|pt| allocator.claim(pt)) {
                v.negotiated_rtx = false;
            }
        }
    }

    assign_fec_payload_types(codecs, &mut allocator);

    for codec in codecs.iter_mut().filter(|c| c.is_enabled()) {
        let d = codec.description_mut();
        if d.negotiated_pt {
            continue;
        }
        match allocator.allocate(d.default_pt) {
            Some(pt) => d.pt = pt,
            None => {
                log::warn!("out of payload types, disabling {}", d.name);
                d.enabled = false;
            }
        }
    }

    for codec in codecs.iter_mut().filter(|c| c.is_enabled()) {
        if let Codec::Video(v) = codec {
            if !v.rtx_enabled || v.negotiated_rtx {
                continue;
            }
            let preferred = v
                .default_rtx_pt
                .unwrap_or(*DYNAMIC_RANGES[0].start());
            v.rtx_pt = allocator.allocate(preferred);
            v.rtx_enabled = v.rtx_pt.is_some();
        }
    }
}

fn assign_fec_payload_types(codecs: &mut [Codec], allocator: &mut PayloadTypeAllocator) {
    let Some((red, ulpfec, red_rtx, negotiated, rtx)) = codecs.iter().find_map(|c| match c {
        Codec::Video(v) if v.description.enabled && v.fec_enabled => Some((
            v.red_pt,
            v.ulpfec_pt,
            v.red_rtx_pt,
            v.negotiated_fec,
            v.rtx_enabled,
        )),
        _ => None,
    }) else {
        return;
    };

    let mut take = |pt: Option<PayloadType>| -> Option<PayloadType> {
        let pt = pt?;
        if negotiated && allocator.claim(pt) {
            Some(pt)
        } else {
            allocator.allocate(pt)
        }
    };
    let red = take(red);
    let ulpfec = take(ulpfec);
    let red_rtx = if rtx { take(red_rtx) } else { None };
    let enabled = red.is_some() && ulpfec.is_some();

    for codec in codecs.iter_mut() {
        if let Codec::Video(v) = codec {
            if !v.fec_enabled {
                continue;
            }
            v.fec_enabled = enabled;
            v.red_pt = red;
            v.ulpfec_pt = ulpfec;
            v.red_rtx_pt = red_rtx;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{AudioCodec, VideoCodec, CODEC_NAME_H264, CODEC_NAME_VP8, CODEC_NAME_VP9};

    #[test]
    fn test_allocator() {
        let mut allocator = PayloadTypeAllocator::new();
        assert_eq!(allocator.allocate(96), Some(96));
        assert_eq!(allocator.allocate(96), Some(97));
        assert!(allocator.claim(100));
        assert!(!allocator.claim(100));
        assert!(!allocator.is_free(128));

        for pt in 96..=127 {
            allocator.claim(pt);
        }
        assert_eq!(allocator.allocate(96), Some(35));
    }

    #[test]
    fn test_assign_payload_types_defaults() {
        let mut codecs: Vec<Codec> = vec![
            VideoCodec::new(CODEC_NAME_VP8, 96).with_rtx(97).into(),
            VideoCodec::new(CODEC_NAME_VP9, 98).with_rtx(99).into(),
        ];
        assign_payload_types(&mut codecs);

        let pts: Vec<(PayloadType, Option<PayloadType>)> = codecs
            .iter()
            .map(|c| match c {
                Codec::Video(v) => (v.description.pt, v.rtx_pt),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(pts, vec![(96, Some(97)), (98, Some(99))]);
    }

    #[test]
    fn test_assign_payload_types_sticky_wins_collision() {
        let mut vp8 = VideoCodec::new(CODEC_NAME_VP8, 96).with_rtx(97);
        vp8.description.pt = 98;
        vp8.description.negotiated_pt = true;
        let mut codecs: Vec<Codec> = vec![
            VideoCodec::new(CODEC_NAME_VP9, 98).into(),
            vp8.into(),
            VideoCodec::h264(126, 1, 0x42e01f).into(),
        ];
        assign_payload_types(&mut codecs);

        assert_eq!(codecs[1].pt(), 98);
        assert_eq!(codecs[0].pt(), 96);
        assert_eq!(codecs[2].pt(), 126);
        assert_eq!(codecs[2].name(), CODEC_NAME_H264);
        let Codec::Video(v) = &codecs[1] else {
            panic!("expected video codec");
        };
        assert_eq!(v.rtx_pt, Some(97));
    }

    #[test]
    fn test_assign_payload_types_fec_shared() {
        let mut codecs: Vec<Codec> = vec![
            VideoCodec::new(CODEC_NAME_VP8, 96)
                .with_rtx(97)
                .with_fec(122, 123, Some(119))
                .into(),
            VideoCodec::new(CODEC_NAME_VP9, 122)
                .with_rtx(123)
                .with_fec(122, 123, Some(119))
                .into(),
        ];
        assign_payload_types(&mut codecs);

        let Codec::Video(vp9) = &codecs[1] else {
            panic!("expected video codec");
        };
        assert_eq!(vp9.red_pt, Some(122));
        assert_eq!(vp9.ulpfec_pt, Some(123));
        assert_eq!(vp9.red_rtx_pt, Some(119));
        assert_ne!(vp9.description.pt, 122);
        assert_ne!(vp9.rtx_pt, Some(123));

        let mut all = BTreeSet::new();
        for c in &codecs {
            let Codec::Video(v) = c else { unreachable!() };
            assert!(all.insert(v.description.pt));
            assert!(all.insert(v.rtx_pt.unwrap_or_default()));
        }
        assert!(!all.contains(&122) && !all.contains(&123) && !all.contains(&119));
    }

    #[test]
    fn test_assign_payload_types_disabled_codec_keeps_nothing() {
        let mut pcmu = AudioCodec::new("PCMU", 0, 8000, 1);
        pcmu.description.enabled = false;
        let mut codecs: Vec<Codec> = vec![
            pcmu.into(),
            AudioCodec::new("PCMA", 0, 8000, 1).into(),
        ];
        assign_payload_types(&mut codecs);
        assert_eq!(codecs[1].pt(), 0);
    }
}
