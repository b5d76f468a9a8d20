use crate::data_object::{data_types, DataObjectHandle, ImageData, PolyData};
use crate::errors::InformationError;
use crate::information::keys::{
    CHILD_INFORMATION, DATA_OBJECT, INPUT_IS_OPTIONAL, INPUT_REQUIRED_DATA_TYPE, NAME,
    REQUEST_DATA, REQUEST_INFORMATION, TIME_STEPS, UPDATE_TIME_STEP, WHOLE_EXTENT,
};
use crate::information::{
    Information, InformationKey, InformationVector, KeyRegistry, RequestKind, ValueKind,
};
use vizpipe_types::Extent;

const IMAGE_OBJECT: InformationKey<DataObjectHandle> =
    InformationKey::with_required_class("IMAGE_OBJECT", "tests", data_types::IMAGE_DATA);

#[test]
fn test_typed_keys() {
    let mut info = Information::new();
    assert!(info.is_empty());

    WHOLE_EXTENT.set(&mut info, Extent::new(0, 9, 0, 9, 0, 0));
    INPUT_IS_OPTIONAL.set(&mut info, true);
    INPUT_REQUIRED_DATA_TYPE.append(&mut info, data_types::POLY_DATA);
    INPUT_REQUIRED_DATA_TYPE.append(&mut info, data_types::IMAGE_DATA);

    assert_eq!(WHOLE_EXTENT.get(&info), Some(Extent::new(0, 9, 0, 9, 0, 0)));
    assert_eq!(INPUT_IS_OPTIONAL.get(&info), Some(true));
    assert_eq!(INPUT_REQUIRED_DATA_TYPE.length(&info), 2);
    assert!(!TIME_STEPS.has(&info));
    assert_eq!(info.len(), 3);

    let before = info.mtime();
    WHOLE_EXTENT.remove(&mut info);
    assert!(info.mtime() > before);
    assert!(!WHOLE_EXTENT.has(&info));
}

#[test]
fn test_shallow_copy_shares_data_objects() {
    let data = DataObjectHandle::new(PolyData::new());
    let mut from = Information::new();
    DATA_OBJECT.set(&mut from, data.clone());
    UPDATE_TIME_STEP.set(&mut from, 1.5);

    let mut to = Information::new();
    NAME.set(&mut to, "kept".to_string());
    DATA_OBJECT.shallow_copy(&from, &mut to);
    assert!(DATA_OBJECT.get(&to).unwrap().ptr_eq(&data));

    // Copying a missing key removes it from the target.
    NAME.shallow_copy(&from, &mut to);
    assert!(!NAME.has(&to));

    let deep = from.deep_copy();
    let copied = DATA_OBJECT.get(&deep).unwrap();
    assert!(!copied.ptr_eq(&data));
    assert!(copied.is_a(data_types::POLY_DATA));
    assert_eq!(UPDATE_TIME_STEP.get(&deep), Some(1.5));
}

#[test]
fn test_required_class() {
    let mut info = Information::new();
    IMAGE_OBJECT.set(&mut info, DataObjectHandle::new(ImageData::new()));
    assert!(IMAGE_OBJECT.has(&info));

    IMAGE_OBJECT.set(&mut info, DataObjectHandle::new(PolyData::new()));
    assert!(!IMAGE_OBJECT.has(&info));
}

#[test]
fn test_one_request_at_a_time() {
    let mut info = Information::new();
    assert_eq!(REQUEST_INFORMATION.set(&mut info), None);
    assert!(REQUEST_INFORMATION.has(&info));

    assert_eq!(REQUEST_INFORMATION.try_set(&mut info), Ok(()));
    assert_eq!(
        REQUEST_DATA.try_set(&mut info),
        Err(InformationError::RequestConflict {
            current: REQUEST_INFORMATION.id(),
            requested: REQUEST_DATA.id(),
        })
    );

    let displaced = REQUEST_DATA.set(&mut info);
    assert_eq!(displaced, Some(REQUEST_INFORMATION.id()));
    assert!(!REQUEST_INFORMATION.has(&info));
    assert!(REQUEST_DATA.has(&info));
    assert_eq!(info.request_key().and_then(RequestKind::from_key), Some(RequestKind::Data));
}

#[test]
fn test_copy_replaces_request() {
    let mut from = Information::new();
    REQUEST_DATA.set(&mut from);
    UPDATE_TIME_STEP.set(&mut from, 2.0);

    let mut to = Information::new();
    REQUEST_INFORMATION.set(&mut to);
    WHOLE_EXTENT.set(&mut to, Extent::new(0, 1, 0, 1, 0, 1));
    to.copy_from(&from, false);

    assert!(REQUEST_DATA.has(&to));
    assert!(!REQUEST_INFORMATION.has(&to));
    assert!(!WHOLE_EXTENT.has(&to));
    assert_eq!(UPDATE_TIME_STEP.get(&to), Some(2.0));
    assert_eq!(to.request_key(), Some(REQUEST_DATA.id()));
}

#[test]
fn test_json_round_trip() {
    let mut child = Information::new();
    NAME.set(&mut child, "block".to_string());
    let mut children = InformationVector::new();
    children.append(child);

    let mut info = Information::new();
    WHOLE_EXTENT.set(&mut info, Extent::new(0, 3, 0, 3, 0, 1));
    TIME_STEPS.set(&mut info, vec![0.0, 0.5]);
    INPUT_REQUIRED_DATA_TYPE.append(&mut info, data_types::POLY_DATA);
    CHILD_INFORMATION.set(&mut info, children);
    REQUEST_DATA.set(&mut info);

    let registry = KeyRegistry::with_standard_keys();
    let json = info.to_json();
    let restored = Information::from_json(&json, &registry).unwrap();

    assert_eq!(restored.to_json(), json);
    assert_eq!(WHOLE_EXTENT.get(&restored), Some(Extent::new(0, 3, 0, 3, 0, 1)));
    assert!(REQUEST_DATA.has(&restored));
    let children = CHILD_INFORMATION.get(&restored).unwrap();
    assert_eq!(NAME.get(children.get(0).unwrap()), Some("block".to_string()));
}

#[test]
fn test_json_rejects_unknown_keys_and_data_objects() {
    let registry = KeyRegistry::with_standard_keys();
    let unknown = vizpipe_types::serde_json::json!({ "nowhere::NOTHING": 1 });
    assert!(matches!(
        Information::from_json(&unknown, &registry),
        Err(InformationError::UnknownKey(_))
    ));

    let mut info = Information::new();
    DATA_OBJECT.set(&mut info, DataObjectHandle::new(PolyData::new()));
    assert!(matches!(
        Information::from_json(&info.to_json(), &registry),
        Err(InformationError::InvalidValue { .. })
    ));
}

#[test]
fn test_registry_conflicts() {
    let mut registry = KeyRegistry::with_standard_keys();
    let size = registry.len();
    registry.register(NAME.descriptor()).unwrap();
    assert_eq!(registry.len(), size);

    let clash: InformationKey<i64> = InformationKey::new("NAME", NAME.location());
    assert!(matches!(
        registry.register(clash.descriptor()),
        Err(InformationError::KeyConflict {
            registered: ValueKind::String,
            requested: ValueKind::Integer,
            ..
        })
    ));
    assert!(registry.lookup_qualified(&NAME.id().to_string()).is_some());
}
