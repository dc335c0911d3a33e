//! Static descriptors of the available data sources.
//!
//! Consumed by file-open dialogs and menus; the pipeline core only uses the
//! declared output capabilities when a source node is constructed.

use crate::pipeline::info::PipelineInfo;
use crate::types::DatasetKind;
use std::path::Path;

/// Declarative description of one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMetadata {
    /// Stable identifier, persisted in snapshots.
    pub id: &'static str,
    pub class_name: &'static str,
    pub menu_name: &'static str,
    pub tooltip: &'static str,
    pub description: &'static str,
    /// Lower-case extensions without the leading dot.
    pub extensions: &'static [&'static str],
    /// File dialog filter, `label|pattern` pairs joined by `|`.
    pub wildcard: &'static str,
    pub output_datasets: &'static [DatasetKind],
}

impl SourceMetadata {
    pub fn output_info(&self) -> PipelineInfo {
        PipelineInfo::new(self.output_datasets)
    }

    /// Whether this source reads files (as opposed to generating data).
    pub fn is_reader(&self) -> bool {
        !self.extensions.is_empty()
    }

    pub fn handles_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

pub static SOURCES: &[SourceMetadata] = &[
    SourceMetadata {
        id: "3DSFile",
        class_name: "ThreeDSImporter",
        menu_name: "3D Studio file",
        tooltip: "Import a 3D Studio file",
        description: "Import a 3D Studio file",
        extensions: &["3ds"],
        wildcard: "3D Studio files (*.3ds)|*.3ds",
        output_datasets: &[DatasetKind::None],
    },
    SourceMetadata {
        id: "ImageFile",
        class_name: "ImageReader",
        menu_name: "Image file (PNG/JPG/BMP/PNM/TIFF)",
        tooltip: "Import a PNG/JPG/BMP/PNM/TIFF image",
        description: "Import a PNG/JPG/BMP/PNM/TIFF image",
        extensions: &["png", "jpg", "jpeg", "bmp", "pnm", "tiff"],
        wildcard: "PNG files (*.png)|*.png|\
                   JPEG files (*.jpg)|*.jpg|\
                   JPEG files (*.jpeg)|*.jpeg|\
                   BMP files (*.bmp)|*.bmp|\
                   PNM files (*.pnm)|*.pnm|\
                   TIFF files (*.tiff)|*.tiff",
        output_datasets: &[DatasetKind::ImageData],
    },
    SourceMetadata {
        id: "PLOT3DFile",
        class_name: "PLOT3DReader",
        menu_name: "PLOT3D file",
        tooltip: "Open a PLOT3D data file",
        description: "Open a PLOT3D data file",
        extensions: &["xyz"],
        wildcard: "PLOT3D files (*.xyz)|*.xyz",
        output_datasets: &[DatasetKind::StructuredGrid],
    },
    SourceMetadata {
        id: "VRMLFile",
        class_name: "VRMLImporter",
        menu_name: "VRML2 file",
        tooltip: "Import a VRML2 data file",
        description: "Import a VRML2 data file",
        extensions: &["wrl"],
        wildcard: "VRML2 files (*.wrl)|*.wrl",
        output_datasets: &[DatasetKind::None],
    },
    SourceMetadata {
        id: "VTKFile",
        class_name: "VTKFileReader",
        menu_name: "VTK file",
        tooltip: "Open a VTK data file",
        description: "Open a VTK data file",
        extensions: &["vtk"],
        wildcard: "VTK files (*.vtk)|*.vtk",
        output_datasets: &[DatasetKind::Any],
    },
    SourceMetadata {
        id: "VTKXMLFile",
        class_name: "VTKXMLFileReader",
        menu_name: "VTK XML file",
        tooltip: "Open a VTK XML data file",
        description: "Open a VTK XML data file",
        extensions: &[
            "xml", "vti", "vtp", "vtr", "vts", "vtu", "pvti", "pvtp", "pvtr", "pvts", "pvtu",
        ],
        wildcard: "VTK XML files (*.xml)|*.xml|\
                   Image Data (*.vti)|*.vti|\
                   Poly Data (*.vtp)|*.vtp|\
                   Rectilinear Grid (*.vtr)|*.vtr|\
                   Structured Grid (*.vts)|*.vts|\
                   Unstructured Grid (*.vtu)|*.vtu|\
                   Parallel Image Data (*.pvti)|*.pvti|\
                   Parallel Poly Data (*.pvtp)|*.pvtp|\
                   Parallel Rectilinear Grid (*.pvtr)|*.pvtr|\
                   Parallel Structured Grid (*.pvts)|*.pvts|\
                   Parallel Unstructured Grid (*.pvtu)|*.pvtu",
        output_datasets: &[DatasetKind::Any],
    },
    SourceMetadata {
        id: "ParametricSurfaceSource",
        class_name: "ParametricSurface",
        menu_name: "Create Parametric surface source",
        tooltip: "Create a parametric surface source",
        description: "Create a parametric surface source",
        extensions: &[],
        wildcard: "",
        output_datasets: &[DatasetKind::PolyData],
    },
    SourceMetadata {
        id: "PointLoadSource",
        class_name: "PointLoad",
        menu_name: "Create Point load source",
        tooltip: "Simulates a point load on a cube of data (for tensors)",
        description: "Simulates a point load on a cube of data (for tensors)",
        extensions: &[],
        wildcard: "",
        output_datasets: &[DatasetKind::ImageData],
    },
];

/// All known sources, in menu order.
pub fn sources() -> &'static [SourceMetadata] {
    SOURCES
}

pub fn find_by_id(id: &str) -> Option<&'static SourceMetadata> {
    SOURCES.iter().find(|s| s.id == id)
}

/// First source that reads files with this extension (case-insensitive,
/// leading dot optional).
pub fn find_by_extension(ext: &str) -> Option<&'static SourceMetadata> {
    SOURCES.iter().find(|s| s.handles_extension(ext))
}

pub fn find_for_path(path: &Path) -> Option<&'static SourceMetadata> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(find_by_extension)
}
