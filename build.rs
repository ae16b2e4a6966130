use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc binary so the build does not depend on a
    // system-installed protoc.
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(protoc) = protoc_bin_vendored::protoc_bin_path() {
            unsafe { std::env::set_var("PROTOC", protoc) };
        }
    }
    let proto_dir = Path::new("proto");
    let proto_file = proto_dir.join("detection.proto");
    tonic_build::compile_protos(proto_file)?;
    Ok(())
}
