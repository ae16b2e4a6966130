tonic::include_proto!("detection");
