//! The standard keys the executive and the bundled data objects understand.

use vizpipe_types::Extent;

use super::key::{InformationKey, KeyDescriptor};
use super::request::RequestKey;
use super::InformationVector;
use crate::data_object::{data_types, DataObjectHandle};

const ALGORITHM: &str = "Algorithm";
const DATA_OBJECT_LOCATION: &str = "DataObject";
const EXECUTIVE: &str = "Executive";
const STREAMING: &str = "StreamingDemandDrivenPipeline";
const COMPOSITE: &str = "CompositeDataSet";

/// Data types an input port accepts. Empty means anything.
pub const INPUT_REQUIRED_DATA_TYPE: InformationKey<Vec<String>> =
    InformationKey::new("INPUT_REQUIRED_DATA_TYPE", ALGORITHM);
pub const INPUT_IS_OPTIONAL: InformationKey<bool> =
    InformationKey::new("INPUT_IS_OPTIONAL", ALGORITHM);
pub const INPUT_IS_REPEATABLE: InformationKey<bool> =
    InformationKey::new("INPUT_IS_REPEATABLE", ALGORITHM);

/// Concrete type the executive instantiates for an output port.
pub const DATA_TYPE_NAME: InformationKey<String> =
    InformationKey::new("DATA_TYPE_NAME", DATA_OBJECT_LOCATION);
pub const DATA_OBJECT: InformationKey<DataObjectHandle> = InformationKey::with_required_class(
    "DATA_OBJECT",
    DATA_OBJECT_LOCATION,
    data_types::DATA_OBJECT,
);
/// Extent of the data actually held by a data object.
pub const DATA_EXTENT: InformationKey<Extent> =
    InformationKey::new("DATA_EXTENT", DATA_OBJECT_LOCATION);
pub const DATA_TIME_STEP: InformationKey<f64> =
    InformationKey::new("DATA_TIME_STEP", DATA_OBJECT_LOCATION);
pub const DATA_PIECE_NUMBER: InformationKey<i64> =
    InformationKey::new("DATA_PIECE_NUMBER", DATA_OBJECT_LOCATION);
pub const DATA_NUMBER_OF_PIECES: InformationKey<i64> =
    InformationKey::new("DATA_NUMBER_OF_PIECES", DATA_OBJECT_LOCATION);
pub const DATA_NUMBER_OF_GHOST_LEVELS: InformationKey<i64> =
    InformationKey::new("DATA_NUMBER_OF_GHOST_LEVELS", DATA_OBJECT_LOCATION);

pub const WHOLE_EXTENT: InformationKey<Extent> = InformationKey::new("WHOLE_EXTENT", STREAMING);
pub const UPDATE_EXTENT: InformationKey<Extent> = InformationKey::new("UPDATE_EXTENT", STREAMING);
/// Set when `UPDATE_EXTENT` was requested explicitly. Otherwise the executive requests the
/// whole extent.
pub const UPDATE_EXTENT_INITIALIZED: InformationKey<bool> =
    InformationKey::new("UPDATE_EXTENT_INITIALIZED", STREAMING);
pub const TIME_STEPS: InformationKey<Vec<f64>> = InformationKey::new("TIME_STEPS", STREAMING);
pub const TIME_RANGE: InformationKey<Vec<f64>> = InformationKey::new("TIME_RANGE", STREAMING);
pub const UPDATE_TIME_STEP: InformationKey<f64> =
    InformationKey::new("UPDATE_TIME_STEP", STREAMING);
pub const UPDATE_PIECE_NUMBER: InformationKey<i64> =
    InformationKey::new("UPDATE_PIECE_NUMBER", STREAMING);
pub const UPDATE_NUMBER_OF_PIECES: InformationKey<i64> =
    InformationKey::new("UPDATE_NUMBER_OF_PIECES", STREAMING);
pub const UPDATE_NUMBER_OF_GHOST_LEVELS: InformationKey<i64> =
    InformationKey::new("UPDATE_NUMBER_OF_GHOST_LEVELS", STREAMING);
pub const BOUNDS: InformationKey<Vec<f64>> = InformationKey::new("BOUNDS", STREAMING);
/// When set on an output, the data is released once every consumer has executed.
pub const RELEASE_DATA: InformationKey<bool> = InformationKey::new("RELEASE_DATA", STREAMING);

/// Information vectors nested in another information object, e.g. per-block metadata.
pub const CHILD_INFORMATION: InformationKey<InformationVector> =
    InformationKey::new("CHILD_INFORMATION", EXECUTIVE);
pub const NAME: InformationKey<String> = InformationKey::new("NAME", COMPOSITE);

pub const REQUEST_DATA_OBJECT: RequestKey = RequestKey::new("REQUEST_DATA_OBJECT", EXECUTIVE);
pub const REQUEST_INFORMATION: RequestKey = RequestKey::new("REQUEST_INFORMATION", EXECUTIVE);
pub const REQUEST_UPDATE_EXTENT: RequestKey =
    RequestKey::new("REQUEST_UPDATE_EXTENT", EXECUTIVE);
pub const REQUEST_DATA: RequestKey = RequestKey::new("REQUEST_DATA", EXECUTIVE);

/// Update keys the executive forwards from an output to the inputs feeding it.
pub(crate) const UPDATE_REQUEST_KEYS: [InformationKey<i64>; 3] = [
    UPDATE_PIECE_NUMBER,
    UPDATE_NUMBER_OF_PIECES,
    UPDATE_NUMBER_OF_GHOST_LEVELS,
];

pub fn standard_key_descriptors() -> Vec<KeyDescriptor> {
    vec![
        INPUT_REQUIRED_DATA_TYPE.descriptor(),
        INPUT_IS_OPTIONAL.descriptor(),
        INPUT_IS_REPEATABLE.descriptor(),
        DATA_TYPE_NAME.descriptor(),
        DATA_OBJECT.descriptor(),
        DATA_EXTENT.descriptor(),
        DATA_TIME_STEP.descriptor(),
        DATA_PIECE_NUMBER.descriptor(),
        DATA_NUMBER_OF_PIECES.descriptor(),
        DATA_NUMBER_OF_GHOST_LEVELS.descriptor(),
        WHOLE_EXTENT.descriptor(),
        UPDATE_EXTENT.descriptor(),
        UPDATE_EXTENT_INITIALIZED.descriptor(),
        TIME_STEPS.descriptor(),
        TIME_RANGE.descriptor(),
        UPDATE_TIME_STEP.descriptor(),
        UPDATE_PIECE_NUMBER.descriptor(),
        UPDATE_NUMBER_OF_PIECES.descriptor(),
        UPDATE_NUMBER_OF_GHOST_LEVELS.descriptor(),
        BOUNDS.descriptor(),
        RELEASE_DATA.descriptor(),
        CHILD_INFORMATION.descriptor(),
        NAME.descriptor(),
    ]
    .into_iter()
    .chain(
        [
            REQUEST_DATA_OBJECT,
            REQUEST_INFORMATION,
            REQUEST_UPDATE_EXTENT,
            REQUEST_DATA,
        ]
        .into_iter()
        .map(|key| KeyDescriptor {
            id: key.id(),
            kind: super::ValueKind::Request,
            required_class: None,
        }),
    )
    .collect()
}
