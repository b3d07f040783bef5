fn main() {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["../stater/proto/stater.proto"], &["../stater/proto"])
        .expect("Failed to compile protobuf");
}
