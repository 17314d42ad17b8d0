// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn endpoint_allocator_is_strictly_increasing() {
    let alloc = EndpointAllocator::new();
    let a = alloc.allocate();
    let b = alloc.allocate();
    assert!(a < b);
}

#[test]
fn originate_then_resolve_round_trips() {
    let table = OriginTable::new();
    let alloc = EndpointAllocator::new();
    let endpoint = alloc.allocate();

    let server_id = table.originate(endpoint, RpcId::Number(42));
    let (resolved_endpoint, original_id) = table.resolve(&server_id).expect("should resolve");
    assert_eq!(resolved_endpoint, endpoint);
    assert_eq!(original_id, RpcId::Number(42));
}

#[test]
fn resolve_is_one_shot() {
    let table = OriginTable::new();
    let alloc = EndpointAllocator::new();
    let endpoint = alloc.allocate();
    let server_id = table.originate(endpoint, RpcId::Number(1));

    assert!(table.resolve(&server_id).is_some());
    assert!(table.resolve(&server_id).is_none());
}

#[test]
fn two_peers_with_overlapping_ids_route_independently() {
    let table = OriginTable::new();
    let alloc = EndpointAllocator::new();
    let peer_a = alloc.allocate();
    let peer_b = alloc.allocate();

    let id_for_a = table.originate(peer_a, RpcId::Number(1));
    let id_for_b = table.originate(peer_b, RpcId::Number(1));
    assert_ne!(id_for_a, id_for_b);

    let (ep, _) = table.resolve(&id_for_a).unwrap();
    assert_eq!(ep, peer_a);
    let (ep, _) = table.resolve(&id_for_b).unwrap();
    assert_eq!(ep, peer_b);
}

#[test]
fn purge_endpoint_drops_only_that_peers_entries() {
    let table = OriginTable::new();
    let alloc = EndpointAllocator::new();
    let peer_a = alloc.allocate();
    let peer_b = alloc.allocate();

    let id_for_a = table.originate(peer_a, RpcId::Number(1));
    let id_for_b = table.originate(peer_b, RpcId::Number(1));

    table.purge_endpoint(peer_a);
    assert!(table.resolve(&id_for_a).is_none());
    assert!(table.resolve(&id_for_b).is_some());
}
