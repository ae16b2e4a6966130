use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// COCO dataset class names, in network output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Ordered class-id to name table.
///
/// Ids beyond the table render as a generic `Class {id}` label instead of
/// failing, so a model with more classes than the table still annotates.
#[derive(Clone, Debug)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// The 80-class COCO table most YOLO checkpoints are trained on.
    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|name| name.to_string()).collect())
    }

    pub fn label_for(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("Class {class_id}"))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Loads a label table from a text file, one class name per line.
pub fn load_class_mapping<P: AsRef<Path>>(path: P) -> Result<ClassLabels> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open label file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(ClassLabels::new(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coco_table_has_eighty_entries() {
        let labels = ClassLabels::coco();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels.label_for(0), "person");
        assert_eq!(labels.label_for(79), "toothbrush");
    }

    #[test]
    fn out_of_range_id_falls_back_to_generic_label() {
        let labels = ClassLabels::new(vec!["cat".into()]);
        assert_eq!(labels.label_for(99), "Class 99");
    }

    #[test]
    fn loads_label_file_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cat").unwrap();
        writeln!(file, "  dog ").unwrap();
        writeln!(file).unwrap();
        let labels = load_class_mapping(file.path()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.label_for(1), "dog");
        assert_eq!(labels.label_for(5), "Class 5");
    }
}
