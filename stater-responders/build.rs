fn main() {
    tonic_build::configure()
        .compile_protos(&["../stater/proto/stater.proto"], &["../stater/proto"])
        .expect("Failed to compile protobuf");
}
