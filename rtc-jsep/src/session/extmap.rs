use std::collections::BTreeMap;

use sdp::description::media::MediaDescription;
use sdp::description::session::ATTR_KEY_EXT_MAP;

use crate::error::{Error, Result};

/// One-byte header extension ids usable in an offer.
pub(crate) const MIN_EXTMAP_ID: u16 = 1;
pub(crate) const MAX_EXTMAP_ID: u16 = 14;

/// A parsed `a=extmap:<id>[/<direction>] <uri>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtmapEntry {
    pub(crate) id: u16,
    pub(crate) uri: String,
}

/// parse_extmaps reads the extmap lines of one m-section.
pub(crate) fn parse_extmaps(md: &MediaDescription) -> Result<Vec<ExtmapEntry>> {
    let mut entries: Vec<ExtmapEntry> = vec![];

    for attr in md.attributes.iter().filter(|a| a.key == ATTR_KEY_EXT_MAP) {
        let value = attr.value.as_deref().unwrap_or_default();
        let mut split = value.split_whitespace();
        let (Some(id_dir), Some(uri)) = (split.next(), split.next()) else {
            return Err(Error::operation(format!("invalid extmap: {value}")));
        };

        let raw_id = id_dir.split('/').next().unwrap_or_default();
        let id = raw_id
            .parse::<u16>()
            .map_err(|_| Error::operation(format!("invalid extmap id: {raw_id}")))?;
        if !(MIN_EXTMAP_ID..=MAX_EXTMAP_ID).contains(&id) {
            return Err(Error::operation(format!(
                "extmap id {id} out of range for {uri}"
            )));
        }
        if entries.iter().any(|e| e.id == id) {
            return Err(Error::operation(format!("duplicate extmap id {id}")));
        }

        entries.push(ExtmapEntry {
            id,
            uri: uri.to_owned(),
        });
    }

    Ok(entries)
}

/// Session-wide binding of header extension ids to URIs.
///
/// Holds only bindings from completed negotiations. Once a URI is bound,
/// neither side may move it to another id nor reuse its id for another URI.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtmapTable {
    by_id: BTreeMap<u16, String>,
    by_uri: BTreeMap<String, u16>,
}

impl ExtmapTable {
    pub(crate) fn id_of(&self, uri: &str) -> Option<u16> {
        self.by_uri.get(uri).copied()
    }

    /// check rejects entries that conflict with a negotiated binding.
    pub(crate) fn check(&self, entries: &[ExtmapEntry]) -> Result<()> {
        for e in entries {
            if let Some(uri) = self.by_id.get(&e.id) {
                if *uri != e.uri {
                    return Err(Error::invalid_access(format!(
                        "attempted to remap id {} from {uri} to {}",
                        e.id, e.uri
                    )));
                }
            }
            if let Some(id) = self.by_uri.get(&e.uri) {
                if *id != e.id {
                    return Err(Error::invalid_access(format!(
                        "changed id for extmap attribute {} from {id} to {}",
                        e.uri, e.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn commit(&mut self, entries: &[ExtmapEntry]) {
        for e in entries {
            self.by_id.insert(e.id, e.uri.clone());
            self.by_uri.insert(e.uri.clone(), e.id);
        }
    }

    /// plan assigns ids to the extensions of an offer.
    ///
    /// Negotiated URIs keep their id; others get the lowest id that is
    /// neither negotiated nor already planned. URIs that find no free id
    /// are left out.
    pub(crate) fn plan<'a, I>(&self, uris: I) -> BTreeMap<String, u16>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut planned: BTreeMap<String, u16> = BTreeMap::new();
        let mut pending = vec![];

        for uri in uris {
            if planned.contains_key(uri) {
                continue;
            }
            match self.id_of(uri) {
                Some(id) => {
                    planned.insert(uri.to_owned(), id);
                }
                None => pending.push(uri),
            }
        }

        for uri in pending {
            if planned.contains_key(uri) {
                continue;
            }
            let free = (MIN_EXTMAP_ID..=MAX_EXTMAP_ID)
                .find(|id| !self.by_id.contains_key(id) && !planned.values().any(|p| p == id));
            match free {
                Some(id) => {
                    planned.insert(uri.to_owned(), id);
                }
                None => log::warn!("no free extmap id for {uri}"),
            }
        }

        planned
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    fn media(lines: &[&str]) -> MediaDescription {
        let mut md = MediaDescription::new_jsep_media_description("audio".to_owned(), vec![]);
        for line in lines {
            md = md.with_value_attribute(ATTR_KEY_EXT_MAP.to_owned(), (*line).to_owned());
        }
        md
    }

    fn entry(id: u16, uri: &str) -> ExtmapEntry {
        ExtmapEntry {
            id,
            uri: uri.to_owned(),
        }
    }

    #[test]
    fn test_parse_extmaps() {
        let tests = vec![
            (vec!["1 urn:a", "2/sendonly urn:b"], None),
            (vec!["0 urn:a"], Some(ErrorKind::OperationError)),
            (vec!["15 urn:a"], Some(ErrorKind::OperationError)),
            (vec!["x urn:a"], Some(ErrorKind::OperationError)),
            (vec!["3"], Some(ErrorKind::OperationError)),
            (vec!["3 urn:a", "3 urn:b"], Some(ErrorKind::OperationError)),
        ];

        for (lines, expected) in tests {
            let result = parse_extmaps(&media(&lines));
            assert_eq!(result.err().map(|e| e.kind()), expected, "{lines:?}");
        }

        let entries = parse_extmaps(&media(&["1 urn:a", "2/sendonly urn:b"])).unwrap();
        assert_eq!(entries, vec![entry(1, "urn:a"), entry(2, "urn:b")]);
    }

    #[test]
    fn test_extmap_table_check() {
        let mut table = ExtmapTable::default();
        // anything goes before a binding exists
        assert!(table.check(&[entry(3, "urn:mid")]).is_ok());
        assert!(table.check(&[entry(14, "urn:mid")]).is_ok());

        table.commit(&[entry(3, "urn:mid")]);
        assert!(table.check(&[entry(3, "urn:mid")]).is_ok());
        assert!(table.check(&[entry(4, "urn:other")]).is_ok());

        let err = table.check(&[entry(14, "urn:mid")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAccessError);
        assert!(err.to_string().contains("changed id for extmap attribute"));

        let err = table.check(&[entry(3, "urn:other")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAccessError);
        assert!(err.to_string().contains("attempted to remap"));
    }

    #[test]
    fn test_extmap_table_plan() {
        let mut table = ExtmapTable::default();
        table.commit(&[entry(1, "urn:b"), entry(3, "urn:c")]);

        let planned = table.plan(["urn:a", "urn:b", "urn:c", "urn:d", "urn:a"]);
        assert_eq!(planned.get("urn:a"), Some(&2));
        assert_eq!(planned.get("urn:b"), Some(&1));
        assert_eq!(planned.get("urn:c"), Some(&3));
        assert_eq!(planned.get("urn:d"), Some(&4));
    }

    #[test]
    fn test_extmap_table_plan_exhausted() {
        let table = ExtmapTable::default();
        let uris: Vec<String> = (0..16).map(|i| format!("urn:{i}")).collect();
        let planned = table.plan(uris.iter().map(String::as_str));
        assert_eq!(planned.len(), 14);
        assert!(planned.values().all(|id| (1..=14).contains(id)));
    }
}
