use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::app::infrastructure::error::{AppError, Result};

/// Assign `value` to the field at `path` (e.g. `"shadow.blur"`) inside
/// `target`. Paths use the persisted (camelCase) field names and may be
/// arbitrarily deep, but every segment must already exist. On any error
/// `target` is left untouched.
pub fn set_path<T>(target: &mut T, path: &str, value: Value) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(AppError::Settings(format!("invalid field path '{}'", path)));
    }

    let mut tree = serde_json::to_value(&*target)?;
    let mut node = &mut tree;
    for segment in &segments {
        node = match node {
            Value::Object(map) => map.get_mut(*segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| AppError::Settings(format!("unknown field '{}'", path)))?;
    }
    *node = value;

    *target = serde_json::from_value(tree)
        .map_err(|e| AppError::Settings(format!("invalid value for '{}': {}", path, e)))?;
    Ok(())
}

/// Read the field at `path`, if it exists.
pub fn get_path<T: Serialize>(target: &T, path: &str) -> Option<Value> {
    let tree = serde_json::to_value(target).ok()?;
    let mut node = &tree;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::settings::{Background, BackgroundKind, DeviceTransform};
    use serde_json::json;

    #[test]
    fn test_set_nested_field() {
        let mut transform = DeviceTransform::default();
        set_path(&mut transform, "shadow.blur", json!(12.5)).unwrap();
        set_path(&mut transform, "rotation3D.y", json!(-20)).unwrap();
        set_path(&mut transform, "use3D", json!(true)).unwrap();
        assert_eq!(transform.shadow.blur, 12.5);
        assert_eq!(transform.rotation_3d.y, -20.0);
        assert!(transform.use_3d);
    }

    #[test]
    fn test_set_inside_array() {
        let mut bg = Background::default();
        set_path(&mut bg, "gradient.stops.1.color", json!("#00ff00")).unwrap();
        assert_eq!(bg.gradient.stops[1].color, "#00ff00");
        set_path(&mut bg, "type", json!("solid")).unwrap();
        assert_eq!(bg.kind, BackgroundKind::Solid);
    }

    #[test]
    fn test_unknown_path_leaves_target_untouched() {
        let mut transform = DeviceTransform::default();
        let before = transform.clone();
        assert!(set_path(&mut transform, "shadow.glow", json!(1)).is_err());
        assert!(set_path(&mut transform, "shadow..blur", json!(1)).is_err());
        assert!(set_path(&mut transform, "scale.inner", json!(1)).is_err());
        assert_eq!(transform, before);
    }

    #[test]
    fn test_type_mismatch_leaves_target_untouched() {
        let mut transform = DeviceTransform::default();
        let before = transform.clone();
        let err = set_path(&mut transform, "scale", json!("big")).unwrap_err();
        assert!(err.to_string().contains("invalid value for 'scale'"));
        assert_eq!(transform, before);
    }

    #[test]
    fn test_get_path() {
        let transform = DeviceTransform::default();
        assert_eq!(get_path(&transform, "frame.width"), Some(json!(12.0)));
        assert_eq!(get_path(&transform, "frame.nope"), None);
    }
}
