use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use serde::Deserialize;
use serde_json::{
    Value,
    json,
};

use crate::{
    decode::quantize::{DequantRange, FrameRanges},
    error::{StreamError, StreamResult},
    io::encode::manifest_info,
    stream::{
        FrameGroup,
        FrameIndex,
        total_frames,
    },
};


#[derive(Deserialize)]
struct GroupEntry {
    frame_index: Vec<usize>,
}

/// frame group boundaries, ordered by numeric id and partitioning `0..total`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupManifest {
    pub groups: Vec<FrameGroup>,
}

impl GroupManifest {
    pub fn from_json(json: &str) -> StreamResult<Self> {
        let entries: BTreeMap<String, GroupEntry> = serde_json::from_str(json)?;
        if entries.is_empty() {
            return Err(StreamError::ManifestMissing("group manifest has no groups".to_string()));
        }

        let mut groups = entries
            .into_iter()
            .map(|(key, entry)| {
                let id: u32 = key
                    .parse()
                    .map_err(|_| StreamError::malformed(format!("group id `{key}` is not an integer")))?;

                match entry.frame_index.as_slice() {
                    &[first, last] if first <= last => Ok(FrameGroup::new(id, first, last)),
                    range => Err(StreamError::malformed(format!("group {id} has frame range {range:?}"))),
                }
            })
            .collect::<StreamResult<Vec<_>>>()?;

        groups.sort_by_key(|group| group.id);

        let mut next = 0;
        for group in &groups {
            if group.first != next {
                return Err(StreamError::malformed(format!(
                    "group {} starts at frame {}, expected {}",
                    group.id,
                    group.first,
                    next,
                )));
            }
            next = group.last + 1;
        }

        Ok(Self { groups })
    }

    pub fn from_path(path: impl AsRef<Path>) -> StreamResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StreamError::ManifestMissing(path.display().to_string()));
        }

        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn total_frames(&self) -> usize {
        total_frames(&self.groups)
    }

    pub fn to_json(&self) -> String {
        let entries: serde_json::Map<String, Value> = self
            .groups
            .iter()
            .map(|group| (group.id.to_string(), json!({ "frame_index": [group.first, group.last] })))
            .collect();

        Value::Object(entries).to_string()
    }
}


/// per-frame dequantization ranges
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DequantManifest {
    frames: HashMap<FrameIndex, FrameRanges>,
}

/// leading position pairs, then scale pairs, then the trailing 16 values
const HEAD: std::ops::Range<usize> = 0..6;
const MIDDLE: std::ops::Range<usize> = 12..18;
const TAIL_LEN: usize = 16;

impl DequantManifest {
    pub fn from_json(json: &str) -> StreamResult<Self> {
        let root: Value = serde_json::from_str(json)?;

        let entries = match root.get("viewers") {
            Some(viewers) => viewers,
            None => &root,
        };
        let Some(entries) = entries.as_object() else {
            return Err(StreamError::malformed("dequantization manifest is not an object"));
        };
        if entries.is_empty() {
            return Err(StreamError::ManifestMissing("dequantization manifest has no frames".to_string()));
        }

        let mut frames = HashMap::with_capacity(entries.len());
        for (key, entry) in entries {
            let frame: FrameIndex = key
                .parse()
                .map_err(|_| StreamError::malformed(format!("frame key `{key}` is not an integer")))?;

            let info = entry.get("info").unwrap_or(entry);
            let info: Vec<f32> = serde_json::from_value(info.clone())
                .map_err(|_| StreamError::malformed(format!("frame {frame} info is not a number array")))?;

            frames.insert(frame, Self::extract(frame, &info)?);
        }

        Ok(Self { frames })
    }

    pub fn from_path(path: impl AsRef<Path>) -> StreamResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StreamError::ManifestMissing(path.display().to_string()));
        }

        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// same ranges for every frame in `0..frames`
    pub fn uniform(frames: usize, range: DequantRange) -> Self {
        Self {
            frames: (0..frames).map(|frame| (frame, FrameRanges::uniform(range))).collect(),
        }
    }

    pub fn insert(&mut self, frame: FrameIndex, ranges: FrameRanges) {
        self.frames.insert(frame, ranges);
    }

    fn extract(frame: FrameIndex, info: &[f32]) -> StreamResult<FrameRanges> {
        if info.len() < MIDDLE.end || info.len() < TAIL_LEN {
            return Err(StreamError::malformed(format!(
                "frame {frame} has {} dequantization values, need at least {}",
                info.len(),
                MIDDLE.end,
            )));
        }

        let flat: Vec<f32> = info[HEAD]
            .iter()
            .chain(&info[MIDDLE])
            .chain(&info[info.len() - TAIL_LEN..])
            .copied()
            .collect();

        FrameRanges::from_flat(&flat)
    }

    pub fn ranges(&self, frame: FrameIndex) -> Option<&FrameRanges> {
        self.frames.get(&frame)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// the `viewers` form read back by `from_json`
    pub fn to_json(&self) -> String {
        let viewers: serde_json::Map<String, Value> = self
            .frames
            .iter()
            .map(|(frame, ranges)| {
                let info = manifest_info(ranges);
                (frame.to_string(), json!({ "num": info.len(), "info": info }))
            })
            .collect();

        json!({ "viewers": viewers }).to_string()
    }

    /// frames in `0..total` without ranges
    pub fn missing_frames(&self, total: usize) -> Vec<FrameIndex> {
        (0..total).filter(|frame| !self.frames.contains_key(frame)).collect()
    }
}
