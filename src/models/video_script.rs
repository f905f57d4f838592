use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::Record;

use super::{decode, encode, Entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTrainingScript {
    pub id: i64,
    pub name: String,
    pub tags: String,
    pub owner: Option<String>,
    pub bonus_id: Option<String>,
    pub script_content: String,
    pub idea: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoTrainingScriptFields {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Tags", skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(rename = "Owner", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idea: Option<String>,
}

impl Entity for VideoTrainingScript {
    const NAME: &'static str = "video_training_script";
    const LABEL: &'static str = "video training script";
    const FIELDS: &'static [&'static str] =
        &["Name", "Tags", "Owner", "bonus_id", "script_content", "idea"];

    type Draft = VideoTrainingScriptFields;
    type Patch = VideoTrainingScriptFields;

    fn from_record(record: Record) -> Result<Self> {
        let envelope = decode::<VideoTrainingScriptFields>(record)?;
        let fields = envelope.fields;
        Ok(VideoTrainingScript {
            id: envelope.id,
            name: fields.name.unwrap_or_default(),
            tags: fields.tags.unwrap_or_default(),
            owner: fields.owner,
            bonus_id: fields.bonus_id,
            script_content: fields.script_content.unwrap_or_default(),
            idea: fields.idea.unwrap_or_default(),
        })
    }

    fn draft_record(draft: &VideoTrainingScriptFields) -> Result<Record> {
        let mut draft = draft.clone();
        draft.tags.get_or_insert_with(String::new);
        encode(&draft)
    }

    fn patch_record(patch: &VideoTrainingScriptFields) -> Result<Record> {
        encode(patch)
    }
}
